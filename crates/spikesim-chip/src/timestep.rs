//! Per-timestep driver and measurement aggregation.

use crate::chip::ChipIndex;
use crate::hardware::Tile;
use crate::message::Message;
use crate::{pipeline, schedule};
use spikesim_arch::NocTopology;
use std::collections::VecDeque;

/// Accumulated results of one simulated timestep.
#[derive(Debug)]
pub struct Timestep {
    /// Timestep number, counted from 1.
    pub timestep: i64,
    /// Outbound message FIFO per core; drained by the scheduler.
    pub messages: Vec<VecDeque<Message>>,
    /// Synaptic events processed.
    pub spike_count: u64,
    /// Neurons that fired.
    pub neurons_fired: u64,
    /// Spike packets sent between cores.
    pub packets_sent: u64,
    /// NoC hops traversed.
    pub total_hops: u64,
    /// Energy consumed, in Joules.
    pub energy: f64,
    /// Simulated duration, in seconds.
    pub sim_time: f64,
}

impl Timestep {
    /// Empty timestep record with one message FIFO per core.
    #[must_use]
    pub fn new(timestep: i64, core_count: usize) -> Self {
        Self {
            timestep,
            messages: (0..core_count).map(|_| VecDeque::new()).collect(),
            spike_count: 0,
            neurons_fired: 0,
            packets_sent: 0,
            total_hops: 0,
            energy: 0.0,
            sim_time: 0.0,
        }
    }
}

/// Drive one timestep: reset counters, run both pipeline phases, schedule
/// the produced messages and aggregate energy. Returns the timestep record
/// and every message in scheduled order (for the message trace).
pub(crate) fn run(
    tiles: &mut [Tile],
    index: &ChipIndex,
    noc: &NocTopology,
    timestep: i64,
) -> (Timestep, Vec<Message>) {
    reset_measurements(tiles);
    set_time(tiles, timestep);

    let mut ts = Timestep::new(timestep, index.core_count());
    pipeline::process_neurons(&mut ts, tiles, index);
    pipeline::process_messages(&mut ts, tiles, index);

    let queues = std::mem::take(&mut ts.messages);
    let (sim_time, scheduled) = schedule::schedule_messages(noc, index.core_count(), queues);
    ts.sim_time = sim_time;
    ts.energy = calculate_energy(tiles);

    for tile in tiles.iter() {
        for core in &tile.cores {
            for synapse in &core.synapse {
                ts.spike_count += synapse.spikes_processed;
            }
            for soma in &core.soma {
                ts.neurons_fired += soma.neurons_fired;
            }
            for axon_out in &core.axon_out_hw {
                ts.packets_sent += axon_out.packets_out;
            }
        }
    }

    (ts, scheduled)
}

/// Total energy across the design for this timestep: per-event unit
/// accumulations plus directional hop counters times hop energy.
pub(crate) fn calculate_energy(tiles: &[Tile]) -> f64 {
    let mut total = 0.0;
    for tile in tiles {
        total += tile.hop_energy();
        for core in &tile.cores {
            for unit in &core.axon_in_hw {
                total += unit.energy;
            }
            for unit in &core.synapse {
                total += unit.energy;
            }
            for unit in &core.dendrite {
                total += unit.energy;
            }
            for unit in &core.soma {
                total += unit.energy;
            }
            for unit in &core.axon_out_hw {
                total += unit.energy;
            }
        }
    }
    total
}

/// Zero every per-timestep counter. Buffered pipeline state (dendrite
/// inputs, soma charge, pending spikes) deliberately survives: it is the
/// hardware staging buffer.
pub(crate) fn reset_measurements(tiles: &mut [Tile]) {
    for tile in tiles.iter_mut() {
        tile.hops = 0;
        tile.north_hops = 0;
        tile.east_hops = 0;
        tile.south_hops = 0;
        tile.west_hops = 0;
        tile.messages_received = 0;
        for core in &mut tile.cores {
            core.next_message_generation_delay = 0.0;
            for unit in &mut core.axon_in_hw {
                unit.spike_messages_in = 0;
                unit.energy = 0.0;
            }
            for unit in &mut core.synapse {
                unit.spikes_processed = 0;
                unit.energy = 0.0;
            }
            for unit in &mut core.dendrite {
                unit.energy = 0.0;
            }
            for unit in &mut core.soma {
                unit.neuron_updates = 0;
                unit.neurons_fired = 0;
                unit.energy = 0.0;
            }
            for unit in &mut core.axon_out_hw {
                unit.packets_out = 0;
                unit.energy = 0.0;
            }
        }
    }
}

fn set_time(tiles: &mut [Tile], timestep: i64) {
    for tile in tiles.iter_mut() {
        for core in &mut tile.cores {
            for unit in &mut core.synapse {
                unit.model.set_time(timestep);
            }
            for unit in &mut core.dendrite {
                unit.model.set_time(timestep);
            }
            for unit in &mut core.soma {
                unit.model.set_time(timestep);
            }
        }
    }
}
