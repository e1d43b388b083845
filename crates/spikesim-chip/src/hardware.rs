//! Runtime hardware state: tiles, cores and their unit stacks.
//!
//! Each unit couples a polymorphic model (synapse/dendrite/soma) or a fixed
//! cost pair (axon-in/out) with the default metrics from the architecture
//! description and the event counters the aggregator turns into energy.

use crate::error::Result;
use crate::mapping::{AxonInModel, AxonOutModel, MappedConnection, MappedNeuron};
use crate::models::{self, DendriteModel, SomaModel, SynapseModel};
use spikesim_arch::{
    AxonInConfiguration, AxonOutConfiguration, CoreConfiguration, CorePipelineConfiguration,
    DendriteConfiguration, SomaConfiguration, SomaEnergyMetrics, SomaLatencyMetrics,
    SynapseConfiguration, TileConfiguration,
};

/// Axon-in unit: charges a fixed cost per received spike message.
#[derive(Debug)]
pub struct AxonInUnit {
    /// Unit name from the architecture description.
    pub name: String,
    /// Energy per received message.
    pub energy_message: f64,
    /// Latency per received message.
    pub latency_message: f64,
    /// Messages received this timestep.
    pub spike_messages_in: u64,
    /// Energy accumulated this timestep.
    pub energy: f64,
}

impl AxonInUnit {
    pub(crate) fn new(config: &AxonInConfiguration) -> Self {
        Self {
            name: config.name.clone(),
            energy_message: config.energy_message,
            latency_message: config.latency_message,
            spike_messages_in: 0,
            energy: 0.0,
        }
    }
}

/// Synapse unit: model plus default per-spike costs.
#[derive(Debug)]
pub struct SynapseUnit {
    /// Unit name from the architecture description.
    pub name: String,
    /// The model handling weight storage and decay.
    pub model: Box<dyn SynapseModel>,
    /// Default energy per processed spike, charged when the model reports
    /// no energy of its own.
    pub energy_process_spike: f64,
    /// Default latency per processed spike.
    pub latency_process_spike: f64,
    /// Spikes processed this timestep.
    pub spikes_processed: u64,
    /// Energy accumulated this timestep.
    pub energy: f64,
}

impl SynapseUnit {
    pub(crate) fn new(config: &SynapseConfiguration) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            model: models::synapse_model(&config.model)?,
            energy_process_spike: config.energy_process_spike,
            latency_process_spike: config.latency_process_spike,
            spikes_processed: 0,
            energy: 0.0,
        })
    }
}

/// Dendrite unit: model plus default per-update costs.
#[derive(Debug)]
pub struct DendriteUnit {
    /// Unit name from the architecture description.
    pub name: String,
    /// The model integrating synaptic events.
    pub model: Box<dyn DendriteModel>,
    /// Default energy per update.
    pub energy_update: f64,
    /// Default latency per update.
    pub latency_update: f64,
    /// Energy accumulated this timestep.
    pub energy: f64,
}

impl DendriteUnit {
    pub(crate) fn new(config: &DendriteConfiguration) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            model: models::dendrite_model(&config.model)?,
            energy_update: config.energy_update,
            latency_update: config.latency_update,
            energy: 0.0,
        })
    }
}

/// Soma unit: model plus the access/update/spike metric triples.
#[derive(Debug)]
pub struct SomaUnit {
    /// Unit name from the architecture description.
    pub name: String,
    /// The model deciding firing status.
    pub model: Box<dyn SomaModel>,
    /// Default energy metrics.
    pub energy_metrics: SomaEnergyMetrics,
    /// Default latency metrics.
    pub latency_metrics: SomaLatencyMetrics,
    /// Neurons whose state changed this timestep.
    pub neuron_updates: u64,
    /// Neurons fired this timestep.
    pub neurons_fired: u64,
    /// Neurons bound to this unit.
    pub neuron_count: u64,
    /// Energy accumulated this timestep.
    pub energy: f64,
}

impl SomaUnit {
    pub(crate) fn new(config: &SomaConfiguration) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            model: models::soma_model(&config.model)?,
            energy_metrics: config.energy_metrics,
            latency_metrics: config.latency_metrics,
            neuron_updates: 0,
            neurons_fired: 0,
            neuron_count: 0,
            energy: 0.0,
        })
    }
}

/// Axon-out unit: charges a fixed cost per sent packet.
#[derive(Debug)]
pub struct AxonOutUnit {
    /// Unit name from the architecture description.
    pub name: String,
    /// Energy per packet sent.
    pub energy_access: f64,
    /// Latency per packet sent.
    pub latency_access: f64,
    /// Packets sent this timestep.
    pub packets_out: u64,
    /// Energy accumulated this timestep.
    pub energy: f64,
}

impl AxonOutUnit {
    pub(crate) fn new(config: &AxonOutConfiguration) -> Self {
        Self {
            name: config.name.clone(),
            energy_access: config.energy_access,
            latency_access: config.latency_access,
            packets_out: 0,
            energy: 0.0,
        }
    }
}

/// One core: its unit stack, mapped network state and transient pipeline
/// buffers.
#[derive(Debug)]
pub struct Core {
    /// Core name (diagnostics).
    pub name: String,
    /// Global core id, unique across the chip.
    pub id: usize,
    /// Offset within the parent tile.
    pub offset: usize,
    /// Parent tile id.
    pub parent_tile_id: usize,
    /// Pipeline buffer placement.
    pub pipeline: CorePipelineConfiguration,
    /// Axon-in units, in hardware order.
    pub axon_in_hw: Vec<AxonInUnit>,
    /// Synapse units, in hardware order.
    pub synapse: Vec<SynapseUnit>,
    /// Dendrite units, in hardware order.
    pub dendrite: Vec<DendriteUnit>,
    /// Soma units, in hardware order.
    pub soma: Vec<SomaUnit>,
    /// Axon-out units, in hardware order.
    pub axon_out_hw: Vec<AxonOutUnit>,
    /// Inbound axon table: one entry per (pre-neuron, this core) pair.
    pub axons_in: Vec<AxonInModel>,
    /// Outbound axon table: destination addresses for resident neurons.
    pub axons_out: Vec<AxonOutModel>,
    /// Neurons mapped onto this core, in mapping order.
    pub neurons: Vec<MappedNeuron>,
    /// Inbound connections, indexed by synapse address.
    pub connections_in: Vec<MappedConnection>,
    /// Neuron-side latency not yet claimed by an outgoing message.
    pub next_message_generation_delay: f64,
}

impl Core {
    pub(crate) fn new(
        config: &CoreConfiguration,
        id: usize,
        offset: usize,
        parent_tile_id: usize,
    ) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            id,
            offset,
            parent_tile_id,
            pipeline: config.pipeline,
            axon_in_hw: config.axon_in.iter().map(AxonInUnit::new).collect(),
            synapse: config
                .synapses
                .iter()
                .map(SynapseUnit::new)
                .collect::<Result<_>>()?,
            dendrite: config
                .dendrites
                .iter()
                .map(DendriteUnit::new)
                .collect::<Result<_>>()?,
            soma: config
                .somas
                .iter()
                .map(SomaUnit::new)
                .collect::<Result<_>>()?,
            axon_out_hw: config.axon_out.iter().map(AxonOutUnit::new).collect(),
            axons_in: Vec::new(),
            axons_out: Vec::new(),
            neurons: Vec::new(),
            connections_in: Vec::new(),
            next_message_generation_delay: 0.0,
        })
    }
}

/// One tile: grid position, hop costs and per-timestep hop counters.
#[derive(Debug)]
pub struct Tile {
    /// Tile name (diagnostics).
    pub name: String,
    /// Tile id, the index into the chip's tile list.
    pub id: usize,
    /// Grid x position.
    pub x: usize,
    /// Grid y position.
    pub y: usize,
    /// Energy per northward hop.
    pub energy_north_hop: f64,
    /// Latency per northward hop.
    pub latency_north_hop: f64,
    /// Energy per eastward hop.
    pub energy_east_hop: f64,
    /// Latency per eastward hop.
    pub latency_east_hop: f64,
    /// Energy per southward hop.
    pub energy_south_hop: f64,
    /// Latency per southward hop.
    pub latency_south_hop: f64,
    /// Energy per westward hop.
    pub energy_west_hop: f64,
    /// Latency per westward hop.
    pub latency_west_hop: f64,
    /// Total hops into this tile this timestep.
    pub hops: u64,
    /// Northward hops this timestep.
    pub north_hops: u64,
    /// Eastward hops this timestep.
    pub east_hops: u64,
    /// Southward hops this timestep.
    pub south_hops: u64,
    /// Westward hops this timestep.
    pub west_hops: u64,
    /// Messages received this timestep.
    pub messages_received: u64,
    /// Cores on this tile, in offset order.
    pub cores: Vec<Core>,
}

impl Tile {
    pub(crate) fn new(config: &TileConfiguration, id: usize) -> Self {
        Self {
            name: config.name.clone(),
            id,
            x: config.x,
            y: config.y,
            energy_north_hop: config.energy_north_hop,
            latency_north_hop: config.latency_north_hop,
            energy_east_hop: config.energy_east_hop,
            latency_east_hop: config.latency_east_hop,
            energy_south_hop: config.energy_south_hop,
            latency_south_hop: config.latency_south_hop,
            energy_west_hop: config.energy_west_hop,
            latency_west_hop: config.latency_west_hop,
            hops: 0,
            north_hops: 0,
            east_hops: 0,
            south_hops: 0,
            west_hops: 0,
            messages_received: 0,
            cores: Vec::new(),
        }
    }

    /// Hop energy spent this timestep, per the directional counters.
    #[must_use]
    pub fn hop_energy(&self) -> f64 {
        self.north_hops as f64 * self.energy_north_hop
            + self.east_hops as f64 * self.energy_east_hop
            + self.south_hops as f64 * self.energy_south_hop
            + self.west_hops as f64 * self.energy_west_hop
    }
}
