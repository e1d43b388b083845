//! Per-unit configuration records.
//!
//! Each record names the model implementing a hardware unit and carries the
//! default energy/latency metrics the pipeline charges when the model does
//! not report its own costs.

/// Axon-in unit: fixed cost per received spike message.
#[derive(Debug, Clone)]
pub struct AxonInConfiguration {
    /// Unit name, unique within its core (e.g. `"axon_in"`).
    pub name: String,
    /// Energy per received spike message, in Joules.
    pub energy_message: f64,
    /// Latency per received spike message, in seconds.
    pub latency_message: f64,
}

/// Synapse unit: model name plus default per-spike costs.
#[derive(Debug, Clone)]
pub struct SynapseConfiguration {
    /// Unit name, unique within its core.
    pub name: String,
    /// Model implementing the unit (e.g. `"current_based"`).
    pub model: String,
    /// Default energy per processed synaptic event, in Joules.
    pub energy_process_spike: f64,
    /// Default latency per processed synaptic event, in seconds.
    pub latency_process_spike: f64,
}

/// Dendrite unit: model name plus default per-update costs.
#[derive(Debug, Clone)]
pub struct DendriteConfiguration {
    /// Unit name, unique within its core.
    pub name: String,
    /// Model implementing the unit (e.g. `"accumulator"`, `"taps"`).
    pub model: String,
    /// Default energy per dendrite update, in Joules.
    pub energy_update: f64,
    /// Default latency per dendrite update, in seconds.
    pub latency_update: f64,
}

/// Soma energy metrics, charged per event kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SomaEnergyMetrics {
    /// Energy to read neuron state, charged on every update.
    pub energy_access_neuron: f64,
    /// Extra energy when the neuron state changes.
    pub energy_update_neuron: f64,
    /// Extra energy when the neuron fires.
    pub energy_spike_out: f64,
}

/// Soma latency metrics, charged per event kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SomaLatencyMetrics {
    /// Latency to read neuron state, charged on every update.
    pub latency_access_neuron: f64,
    /// Extra latency when the neuron state changes.
    pub latency_update_neuron: f64,
    /// Extra latency when the neuron fires.
    pub latency_spike_out: f64,
}

/// Soma unit: model name plus default metric triples.
#[derive(Debug, Clone)]
pub struct SomaConfiguration {
    /// Unit name, unique within its core.
    pub name: String,
    /// Model implementing the unit (e.g. `"leaky_integrate_fire"`).
    pub model: String,
    /// Default energy metrics.
    pub energy_metrics: SomaEnergyMetrics,
    /// Default latency metrics.
    pub latency_metrics: SomaLatencyMetrics,
}

/// Axon-out unit: fixed cost per sent packet.
#[derive(Debug, Clone)]
pub struct AxonOutConfiguration {
    /// Unit name, unique within its core.
    pub name: String,
    /// Energy per packet sent, in Joules.
    pub energy_access: f64,
    /// Latency per packet sent, in seconds.
    pub latency_access: f64,
}
