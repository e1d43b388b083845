//! Spike messages and placeholders exchanged between cores.

use spikesim_net::NeuronId;

/// One endpoint of a message route.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint {
    /// Tile id.
    pub tile: usize,
    /// Global core id.
    pub core: usize,
    /// Core offset within the tile.
    pub core_offset: usize,
    /// Tile grid x.
    pub x: usize,
    /// Tile grid y.
    pub y: usize,
}

/// A spike message in flight, or a placeholder carrying unclaimed
/// neuron-processing time.
///
/// Identity fields are fixed at construction; the scheduling fields are
/// filled in by the message-side pipeline (`network_delay`,
/// `receive_delay`) and the NoC scheduler (timestamps, `blocked_delay`).
#[derive(Debug, Clone)]
pub struct Message {
    /// Neuron whose processing produced this message.
    pub src_neuron: NeuronId,
    /// Source tile id.
    pub src_tile_id: usize,
    /// Source global core id.
    pub src_core_id: usize,
    /// Source core offset within its tile.
    pub src_core_offset: usize,
    /// Source tile grid x.
    pub src_x: usize,
    /// Source tile grid y.
    pub src_y: usize,
    /// Destination tile id (unset for placeholders).
    pub dest_tile_id: usize,
    /// Destination global core id.
    pub dest_core_id: usize,
    /// Destination core offset within its tile.
    pub dest_core_offset: usize,
    /// Destination tile grid x.
    pub dest_x: usize,
    /// Destination tile grid y.
    pub dest_y: usize,
    /// Axon-in unit index at the destination core.
    pub dest_axon_hw: usize,
    /// Index into the destination core's inbound axon table.
    pub dest_axon_id: usize,
    /// Manhattan distance between source and destination tiles.
    pub hops: usize,
    /// Synapses driven at the destination axon.
    pub spikes: usize,
    /// Timestep this message was generated in.
    pub timestep: i64,
    /// True for dummy messages that only carry generation delay.
    pub placeholder: bool,
    /// Time to generate this message at the source core.
    pub generation_delay: f64,
    /// Static network traversal delay from per-hop latencies.
    pub network_delay: f64,
    /// Time to process this message at the destination core.
    pub receive_delay: f64,
    /// Extra delay imposed by NoC backpressure.
    pub blocked_delay: f64,
    /// When the source core put this message on the network.
    pub sent_timestamp: f64,
    /// When the destination core started receiving it.
    pub received_timestamp: f64,
    /// When the destination core finished processing it.
    pub processed_timestamp: f64,
    /// Currently occupying NoC links.
    pub in_noc: bool,
}

impl Message {
    fn base(src_neuron: NeuronId, src: Endpoint, timestep: i64) -> Self {
        Self {
            src_neuron,
            src_tile_id: src.tile,
            src_core_id: src.core,
            src_core_offset: src.core_offset,
            src_x: src.x,
            src_y: src.y,
            dest_tile_id: 0,
            dest_core_id: 0,
            dest_core_offset: 0,
            dest_x: 0,
            dest_y: 0,
            dest_axon_hw: 0,
            dest_axon_id: 0,
            hops: 0,
            spikes: 0,
            timestep,
            placeholder: true,
            generation_delay: 0.0,
            network_delay: 0.0,
            receive_delay: 0.0,
            blocked_delay: 0.0,
            sent_timestamp: f64::NEG_INFINITY,
            received_timestamp: f64::NEG_INFINITY,
            processed_timestamp: f64::NEG_INFINITY,
            in_noc: false,
        }
    }

    /// Dummy message carrying the remaining neuron-processing time of a
    /// core, so the scheduler can advance that core's clock.
    pub(crate) fn placeholder(
        src_neuron: NeuronId,
        src: Endpoint,
        timestep: i64,
        generation_delay: f64,
    ) -> Self {
        let mut m = Self::base(src_neuron, src, timestep);
        m.generation_delay = generation_delay;
        m
    }

    /// Real spike message towards one destination axon.
    pub(crate) fn spike(
        src_neuron: NeuronId,
        src: Endpoint,
        dest: Endpoint,
        dest_axon_id: usize,
        timestep: i64,
    ) -> Self {
        let mut m = Self::base(src_neuron, src, timestep);
        m.placeholder = false;
        m.dest_tile_id = dest.tile;
        m.dest_core_id = dest.core;
        m.dest_core_offset = dest.core_offset;
        m.dest_x = dest.x;
        m.dest_y = dest.y;
        m.dest_axon_id = dest_axon_id;
        m.hops = src.x.abs_diff(dest.x) + src.y.abs_diff(dest.y);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(tile: usize, x: usize, y: usize) -> Endpoint {
        Endpoint {
            tile,
            core: tile,
            core_offset: 0,
            x,
            y,
        }
    }

    fn nid() -> NeuronId {
        NeuronId {
            group: "g".into(),
            id: 0,
        }
    }

    #[test]
    fn spike_hops_are_manhattan() {
        let m = Message::spike(nid(), endpoint(0, 0, 0), endpoint(5, 2, 3), 0, 1);
        assert_eq!(m.hops, 5);
        assert!(!m.placeholder);
    }

    #[test]
    fn placeholder_has_no_destination() {
        let m = Message::placeholder(nid(), endpoint(0, 1, 1), 1, 2.5e-9);
        assert!(m.placeholder);
        assert_eq!(m.generation_delay, 2.5e-9);
        assert_eq!(m.hops, 0);
    }
}
