//! Hardware-unit model contracts and the built-in model registry.
//!
//! A core's synapse, dendrite and soma units are polymorphic: the pipeline
//! only sees the trait objects below. Each `update` is a pure step of the
//! model's state machine returning the produced current (or firing status)
//! plus optional energy/latency; when a model omits a cost the pipeline
//! charges the unit's configured default instead. Axon-in and axon-out
//! units are plain cost reporters and need no model trait.
//!
//! Built-in models (registered by name):
//!
//! | Kind | Name | Behaviour |
//! |------|------|-----------|
//! | synapse | `current_based` | weight table with configurable bit resolution |
//! | dendrite | `accumulator` | per-neuron charge accumulator with leak decay |
//! | dendrite | `taps` | 1-D multi-tap cable with time/space constants |
//! | soma | `leaky_integrate_fire` | LIF with leak decay, bias, dual thresholds |
//! | soma | `truenorth` | linear leak, stochastic threshold, saturating resets |
//! | soma | `input` | spike-list / Poisson stimulus source |

mod dendrite;
mod soma;
mod synapse;

pub use dendrite::{AccumulatorModel, MultiTapModel};
pub use soma::{InputModel, LeakyIntegrateFireModel, TrueNorthModel};
pub use synapse::CurrentBasedSynapseModel;

use crate::error::{Result, SimError};
use spikesim_net::AttributeValue;
use std::collections::HashMap;
use std::fmt::Debug;

/// Firing status reported by a soma update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeuronStatus {
    /// No state change.
    #[default]
    Idle,
    /// State changed but no spike.
    Updated,
    /// Spiked this update.
    Fired,
}

impl NeuronStatus {
    /// True for [`NeuronStatus::Updated`] or [`NeuronStatus::Fired`].
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Updated | Self::Fired)
    }
}

/// Result of one synapse update.
#[derive(Debug, Clone, Copy)]
pub struct SynapseResult {
    /// Synaptic current produced (the weight, on a read).
    pub current: f64,
    /// Energy consumed; `None` charges the unit default.
    pub energy: Option<f64>,
    /// Latency incurred; `None` charges the unit default.
    pub latency: Option<f64>,
}

/// Result of one dendrite update.
#[derive(Debug, Clone, Copy)]
pub struct DendriteResult {
    /// Charge presented to the soma after this update.
    pub current: f64,
    /// Energy consumed; `None` charges the unit default.
    pub energy: Option<f64>,
    /// Latency incurred; `None` charges the unit default.
    pub latency: Option<f64>,
}

/// Result of one soma update.
#[derive(Debug, Clone, Copy)]
pub struct SomaResult {
    /// Firing status after this update.
    pub status: NeuronStatus,
    /// Energy consumed; `None` charges the unit's metric defaults.
    pub energy: Option<f64>,
    /// Latency incurred; `None` charges the unit's metric defaults.
    pub latency: Option<f64>,
}

/// Synaptic event presented to a dendrite unit.
#[derive(Debug, Clone, Copy)]
pub struct SynapticInput<'a> {
    /// Current read from the synapse unit.
    pub current: f64,
    /// Dendrite parameters of the originating connection (e.g. tap index).
    pub params: &'a HashMap<String, AttributeValue>,
}

/// Synapse unit model: a weight store addressed per connection.
pub trait SynapseModel: Debug + Send {
    /// Advance the synapse at `synapse_address` by one invocation. With
    /// `read_weight` the stored weight is returned as current; without it
    /// only passive decay is applied.
    fn update(&mut self, synapse_address: usize, read_weight: bool) -> SynapseResult;

    /// Apply one attribute to `synapse_address`. Unknown names are ignored;
    /// a wrong value type is fatal.
    ///
    /// # Errors
    ///
    /// Returns an attribute-coercion error on type mismatch.
    fn set_attribute(
        &mut self,
        synapse_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()>;

    /// Current simulation timestep, advanced by the pipeline.
    fn set_time(&mut self, _timestep: i64) {}
}

/// Dendrite unit model: integrates synaptic events into soma charge.
pub trait DendriteModel: Debug + Send {
    /// Advance the dendrite at `neuron_address`. Without `synapse_in` only
    /// the passive leak is applied.
    fn update(&mut self, neuron_address: usize, synapse_in: Option<SynapticInput<'_>>)
        -> DendriteResult;

    /// Apply one attribute to `neuron_address`. Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an attribute-coercion error on type mismatch.
    fn set_attribute(
        &mut self,
        neuron_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()>;

    /// Current simulation timestep, advanced by the pipeline.
    fn set_time(&mut self, _timestep: i64) {}

    /// Clear all per-neuron state.
    fn reset(&mut self);
}

/// Soma unit model: membrane dynamics and firing decision.
pub trait SomaModel: Debug + Send {
    /// Advance the neuron at `neuron_address` by one timestep. `current_in`
    /// absent means no new input this invocation.
    fn update(&mut self, neuron_address: usize, current_in: Option<f64>) -> SomaResult;

    /// Apply one attribute to `neuron_address`. Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an attribute-coercion error on type mismatch.
    fn set_attribute(
        &mut self,
        neuron_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()>;

    /// Membrane potential at `neuron_address`, for the potential trace.
    fn get_potential(&self, _neuron_address: usize) -> f64 {
        0.0
    }

    /// Current simulation timestep, advanced by the pipeline.
    fn set_time(&mut self, _timestep: i64) {}

    /// Clear all per-neuron state.
    fn reset(&mut self);
}

/// Membrane reset behaviour after crossing a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetMode {
    /// Jump to the configured reset potential.
    #[default]
    Hard,
    /// Subtract the threshold.
    Soft,
    /// Clamp to the threshold.
    Saturate,
    /// Leave the potential unchanged.
    None,
}

impl ResetMode {
    /// Parse a reset mode from its network-file spelling.
    ///
    /// # Errors
    ///
    /// Returns an attribute-coercion error on unknown spellings.
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        match value {
            "hard" => Ok(Self::Hard),
            "soft" => Ok(Self::Soft),
            "saturate" => Ok(Self::Saturate),
            "none" => Ok(Self::None),
            _ => Err(spikesim_net::NetworkError::attribute_type(name, "reset mode", "string")
                .into()),
        }
    }
}

/// Instantiate a synapse model by registry name.
///
/// # Errors
///
/// Returns [`SimError::UnknownModel`] for unregistered names.
pub fn synapse_model(name: &str) -> Result<Box<dyn SynapseModel>> {
    match name {
        "current_based" => Ok(Box::<CurrentBasedSynapseModel>::default()),
        other => Err(SimError::unknown_model("synapse", other)),
    }
}

/// Instantiate a dendrite model by registry name.
///
/// # Errors
///
/// Returns [`SimError::UnknownModel`] for unregistered names.
pub fn dendrite_model(name: &str) -> Result<Box<dyn DendriteModel>> {
    match name {
        "accumulator" => Ok(Box::<AccumulatorModel>::default()),
        "taps" => Ok(Box::<MultiTapModel>::default()),
        other => Err(SimError::unknown_model("dendrite", other)),
    }
}

/// Instantiate a soma model by registry name.
///
/// # Errors
///
/// Returns [`SimError::UnknownModel`] for unregistered names.
pub fn soma_model(name: &str) -> Result<Box<dyn SomaModel>> {
    match name {
        "leaky_integrate_fire" => Ok(Box::<LeakyIntegrateFireModel>::default()),
        "truenorth" => Ok(Box::<TrueNorthModel>::default()),
        "input" => Ok(Box::<InputModel>::default()),
        other => Err(SimError::unknown_model("soma", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_builtins() {
        assert!(synapse_model("current_based").is_ok());
        assert!(dendrite_model("accumulator").is_ok());
        assert!(dendrite_model("taps").is_ok());
        assert!(soma_model("leaky_integrate_fire").is_ok());
        assert!(soma_model("truenorth").is_ok());
        assert!(soma_model("input").is_ok());
    }

    #[test]
    fn registry_rejects_unknown() {
        assert!(matches!(
            soma_model("hodgkin_huxley_gpu"),
            Err(SimError::UnknownModel { kind: "soma", .. })
        ));
    }

    #[test]
    fn reset_mode_parsing() {
        assert_eq!(ResetMode::parse("reset_mode", "hard").unwrap(), ResetMode::Hard);
        assert_eq!(ResetMode::parse("reset_mode", "soft").unwrap(), ResetMode::Soft);
        assert_eq!(
            ResetMode::parse("reset_mode", "saturate").unwrap(),
            ResetMode::Saturate
        );
        assert!(ResetMode::parse("reset_mode", "bounce").is_err());
    }
}
