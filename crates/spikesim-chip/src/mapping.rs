//! Post-mapping network state: neurons and connections as placed on cores.
//!
//! Cross-references between cores use arena addresses (`core id` + index)
//! resolved through the chip root, never owning pointers; the tile/core
//! arenas are fixed once mapping completes.

use crate::models::NeuronStatus;
use spikesim_net::{AttributeValue, NeuronId};
use std::collections::HashMap;

/// Address of a mapped neuron: global core id plus index within the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeuronAddress {
    /// Global core id.
    pub core: usize,
    /// Index into that core's neuron list.
    pub neuron: usize,
}

/// One synaptic event buffered at the dendrite input.
#[derive(Debug, Clone, Copy)]
pub struct DendriteInput {
    /// Current read from the synapse unit.
    pub current: f64,
    /// Synapse address of the originating connection.
    pub synapse_address: usize,
}

/// A neuron as mapped onto a core.
#[derive(Debug)]
pub struct MappedNeuron {
    /// Network identity `(group, id)`.
    pub id: NeuronId,
    /// Address within the soma/dendrite models (index in the core).
    pub mapped_address: usize,
    /// Dendrite unit index within the core.
    pub dendrite_hw: usize,
    /// Soma unit index within the core.
    pub soma_hw: usize,
    /// Axon-out unit index within the core.
    pub axon_out_hw: usize,
    /// One axon-out table index per distinct destination core.
    pub axon_out_addresses: Vec<usize>,
    /// Timestep the dendrite state last advanced to.
    pub dendrite_last_updated: i64,
    /// Timestep the soma state last advanced to.
    pub soma_last_updated: i64,
    /// Synaptic events received this timestep.
    pub spike_count: u32,
    /// Spikes to force regardless of soma state.
    pub forced_spikes: u32,
    /// Record in the spike trace.
    pub log_spikes: bool,
    /// Record in the potential trace.
    pub log_potential: bool,
    /// Firing status after the last soma update.
    pub status: NeuronStatus,
    /// Synaptic events waiting at the dendrite buffer.
    pub dendrite_input_synapses: Vec<DendriteInput>,
    /// Charge waiting at the soma buffer.
    pub soma_input_charge: f64,
    /// Spike waiting at the axon-out buffer.
    pub axon_out_input_spike: bool,
}

impl MappedNeuron {
    pub(crate) fn new(
        id: NeuronId,
        mapped_address: usize,
        dendrite_hw: usize,
        soma_hw: usize,
        axon_out_hw: usize,
    ) -> Self {
        Self {
            id,
            mapped_address,
            dendrite_hw,
            soma_hw,
            axon_out_hw,
            axon_out_addresses: Vec::new(),
            dendrite_last_updated: 0,
            soma_last_updated: 0,
            spike_count: 0,
            forced_spikes: 0,
            log_spikes: false,
            log_potential: false,
            status: NeuronStatus::Idle,
            dendrite_input_synapses: Vec::new(),
            soma_input_charge: 0.0,
            axon_out_input_spike: false,
        }
    }
}

/// A connection as mapped onto the destination core.
///
/// Lives in the post-neuron core's `connections_in` at index
/// `synapse_address`.
#[derive(Debug)]
pub struct MappedConnection {
    /// Source neuron address.
    pub pre_neuron: NeuronAddress,
    /// Destination neuron address (same core as this connection).
    pub post_neuron: NeuronAddress,
    /// Synapse unit index within the destination core.
    pub synapse_hw: usize,
    /// Address within the synapse unit's weight store.
    pub synapse_address: usize,
    /// Parameters forwarded to the dendrite unit with each spike.
    pub dendrite_params: HashMap<String, AttributeValue>,
    /// Timestep the synapse state last advanced to.
    pub last_updated: i64,
}

/// Inbound axon: the synapse addresses one pre-neuron drives on this core.
#[derive(Debug, Default)]
pub struct AxonInModel {
    /// Synapse addresses to process when this axon receives a spike.
    pub synapse_addresses: Vec<usize>,
}

/// Outbound axon: where one pre-neuron's spike is delivered.
#[derive(Debug, Clone, Copy)]
pub struct AxonOutModel {
    /// Destination tile id.
    pub dest_tile_id: usize,
    /// Destination core offset within that tile.
    pub dest_core_offset: usize,
    /// Index into the destination core's `axons_in` table.
    pub dest_axon_id: usize,
}
