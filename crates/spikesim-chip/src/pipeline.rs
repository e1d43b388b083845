//! Per-core processing pipeline.
//!
//! Each core buffers its state at a configurable pipeline stage. Stages at
//! or after the buffer run once per neuron per timestep (the neuron-side
//! phase); stages before it run once per incoming spike message (the
//! message-side phase). Hardware units advance lazily: every unit address
//! tracks the timestep it last reached and catches up with passive updates
//! when next touched, so an address idle for k timesteps pays exactly k
//! passive updates.

use crate::chip::ChipIndex;
use crate::hardware::{Core, Tile};
use crate::mapping::DendriteInput;
use crate::message::{Endpoint, Message};
use crate::models::{NeuronStatus, SynapticInput};
use crate::timestep::Timestep;
use spikesim_arch::BufferPosition;
use tracing::trace;

/// Neuron-side phase: run every mapped neuron through the stages at or
/// after its core's buffer, then flush unclaimed processing latency as a
/// placeholder message.
pub(crate) fn process_neurons(ts: &mut Timestep, tiles: &mut [Tile], index: &ChipIndex) {
    for tile in tiles.iter_mut() {
        let (tile_id, tile_x, tile_y) = (tile.id, tile.x, tile.y);
        for core in &mut tile.cores {
            for neuron in 0..core.neurons.len() {
                process_neuron(ts, index, (tile_id, tile_x, tile_y), core, neuron);
            }

            if core.next_message_generation_delay != 0.0 {
                if let Some(last_neuron) = core.neurons.last() {
                    // Remaining neuron processing that produced no spike
                    // message still occupies the core's clock.
                    let src = Endpoint {
                        tile: tile_id,
                        core: core.id,
                        core_offset: core.offset,
                        x: tile_x,
                        y: tile_y,
                    };
                    ts.messages[core.id].push_back(Message::placeholder(
                        last_neuron.id.clone(),
                        src,
                        ts.timestep,
                        core.next_message_generation_delay,
                    ));
                    core.next_message_generation_delay = 0.0;
                }
            }
        }
    }
}

fn process_neuron(
    ts: &mut Timestep,
    index: &ChipIndex,
    tile: (usize, usize, usize),
    core: &mut Core,
    neuron: usize,
) {
    let buffer = core.pipeline.buffer_position;
    let mut latency = 0.0;
    if buffer <= BufferPosition::BeforeDendrite {
        latency += process_dendrite(ts.timestep, core, neuron);
    }
    if buffer <= BufferPosition::BeforeSoma {
        latency += process_soma(ts.timestep, core, neuron);
    }
    latency += process_axon_out(ts, index, tile, core, neuron);

    core.next_message_generation_delay += latency;
    core.neurons[neuron].spike_count = 0;
}

/// Message-side phase: resolve every outbound spike message to its
/// destination core, charge static network costs, then run each message
/// through the destination's pre-buffer stages.
pub(crate) fn process_messages(ts: &mut Timestep, tiles: &mut [Tile], index: &ChipIndex) {
    let mut inbound: Vec<Vec<(usize, usize)>> = vec![Vec::new(); index.core_count()];
    for (src_core, queue) in ts.messages.iter_mut().enumerate() {
        for (i, m) in queue.iter_mut().enumerate() {
            if m.placeholder {
                continue;
            }
            receive_message(tiles, m);
            ts.total_hops += m.hops as u64;
            inbound[m.dest_core_id].push((src_core, i));
        }
    }

    for (dest_core, sources) in inbound.iter().enumerate() {
        if sources.is_empty() {
            continue;
        }
        let (tile_index, core_offset) = index.location(dest_core);
        trace!(core = dest_core, messages = sources.len(), "processing inbound");
        for &(src_core, i) in sources {
            let core = &mut tiles[tile_index].cores[core_offset];
            let m = ts.messages[src_core]
                .get_mut(i)
                .expect("inbound message index");
            let processing = process_message(ts.timestep, core, m);
            m.receive_delay += processing;
        }
    }
}

/// Charge the static dimension-ordered network traversal and record hop
/// counters at the destination tile.
fn receive_message(tiles: &mut [Tile], m: &mut Message) {
    debug_assert!(m.src_tile_id < tiles.len());
    debug_assert!(m.dest_tile_id < tiles.len());
    let (latency_east, latency_west, latency_north, latency_south) = {
        let src = &tiles[m.src_tile_id];
        (
            src.latency_east_hop,
            src.latency_west_hop,
            src.latency_north_hop,
            src.latency_south_hop,
        )
    };
    let dest = &mut tiles[m.dest_tile_id];

    let x_hops = m.src_x.abs_diff(m.dest_x) as u64;
    let y_hops = m.src_y.abs_diff(m.dest_y) as u64;
    let mut network_delay = 0.0;
    if m.src_x < m.dest_x {
        dest.east_hops += x_hops;
        network_delay += x_hops as f64 * latency_east;
    } else {
        dest.west_hops += x_hops;
        network_delay += x_hops as f64 * latency_west;
    }
    if m.src_y < m.dest_y {
        dest.north_hops += y_hops;
        network_delay += y_hops as f64 * latency_north;
    } else {
        dest.south_hops += y_hops;
        network_delay += y_hops as f64 * latency_south;
    }
    dest.hops += x_hops + y_hops;
    dest.messages_received += 1;
    m.network_delay = network_delay;
}

/// Run one received message through the stages before the buffer,
/// returning the accumulated receive latency.
fn process_message(timestep: i64, core: &mut Core, m: &mut Message) -> f64 {
    let mut latency = process_axon_in(core, m);

    debug_assert!(m.dest_axon_id < core.axons_in.len());
    let synapse_addresses = core.axons_in[m.dest_axon_id].synapse_addresses.clone();
    m.spikes = synapse_addresses.len();
    let buffer = core.pipeline.buffer_position;
    for synapse_address in synapse_addresses {
        latency += process_synapse(timestep, core, synapse_address);
        if buffer == BufferPosition::BeforeDendrite {
            continue;
        }
        let post_neuron = core.connections_in[synapse_address].post_neuron.neuron;
        latency += process_dendrite(timestep, core, post_neuron);
        if buffer == BufferPosition::BeforeSoma {
            continue;
        }
        latency += process_soma(timestep, core, post_neuron);
        debug_assert_eq!(buffer, BufferPosition::BeforeAxonOut);
    }

    latency
}

fn process_axon_in(core: &mut Core, m: &Message) -> f64 {
    debug_assert!(m.dest_axon_hw < core.axon_in_hw.len());
    let unit = &mut core.axon_in_hw[m.dest_axon_hw];
    unit.spike_messages_in += 1;
    unit.energy += unit.energy_message;
    unit.latency_message
}

fn process_synapse(timestep: i64, core: &mut Core, synapse_address: usize) -> f64 {
    let Core {
        connections_in,
        synapse,
        neurons,
        ..
    } = core;
    let con = &mut connections_in[synapse_address];
    let unit = &mut synapse[con.synapse_hw];

    while con.last_updated < timestep {
        unit.model.update(synapse_address, false);
        con.last_updated += 1;
    }
    let result = unit.model.update(synapse_address, true);

    let post = &mut neurons[con.post_neuron.neuron];
    post.dendrite_input_synapses.push(DendriteInput {
        current: result.current,
        synapse_address,
    });
    post.spike_count += 1;
    unit.spikes_processed += 1;
    unit.energy += result.energy.unwrap_or(unit.energy_process_spike);
    result.latency.unwrap_or(unit.latency_process_spike)
}

fn process_dendrite(timestep: i64, core: &mut Core, neuron: usize) -> f64 {
    let Core {
        neurons,
        dendrite,
        connections_in,
        ..
    } = core;
    let n = &mut neurons[neuron];
    let unit = &mut dendrite[n.dendrite_hw];
    let mut latency = 0.0;

    while n.dendrite_last_updated < timestep {
        let result = unit.model.update(n.mapped_address, None);
        n.soma_input_charge = result.current;
        unit.energy += result.energy.unwrap_or(unit.energy_update);
        latency += result.latency.unwrap_or(unit.latency_update);
        n.dendrite_last_updated += 1;
    }

    let inputs = std::mem::take(&mut n.dendrite_input_synapses);
    for input in inputs {
        let synapse_in = SynapticInput {
            current: input.current,
            params: &connections_in[input.synapse_address].dendrite_params,
        };
        let result = unit.model.update(n.mapped_address, Some(synapse_in));
        n.soma_input_charge = result.current;
        unit.energy += result.energy.unwrap_or(unit.energy_update);
        latency += result.latency.unwrap_or(unit.latency_update);
    }

    latency
}

fn process_soma(timestep: i64, core: &mut Core, neuron: usize) -> f64 {
    let Core { neurons, soma, .. } = core;
    let n = &mut neurons[neuron];
    let unit = &mut soma[n.soma_hw];
    let mut latency = 0.0;

    while n.soma_last_updated < timestep {
        let current_in = if n.spike_count > 0 || n.soma_input_charge.abs() > 0.0 {
            let charge = n.soma_input_charge;
            n.soma_input_charge = 0.0;
            Some(charge)
        } else {
            None
        };
        let result = unit.model.update(n.mapped_address, current_in);
        n.status = result.status;
        if n.forced_spikes > 0 {
            n.status = NeuronStatus::Fired;
            n.forced_spikes -= 1;
        }

        let mut default_energy = unit.energy_metrics.energy_access_neuron;
        let mut default_latency = unit.latency_metrics.latency_access_neuron;
        if n.status.changed() {
            default_energy += unit.energy_metrics.energy_update_neuron;
            default_latency += unit.latency_metrics.latency_update_neuron;
            unit.neuron_updates += 1;
        }
        if n.status == NeuronStatus::Fired {
            default_energy += unit.energy_metrics.energy_spike_out;
            default_latency += unit.latency_metrics.latency_spike_out;
            unit.neurons_fired += 1;
            n.axon_out_input_spike = true;
            trace!(neuron = %n.id, "fired");
        }
        unit.energy += result.energy.unwrap_or(default_energy);
        latency += result.latency.unwrap_or(default_latency);
        n.soma_last_updated += 1;
    }

    latency
}

fn process_axon_out(
    ts: &mut Timestep,
    index: &ChipIndex,
    tile: (usize, usize, usize),
    core: &mut Core,
    neuron: usize,
) -> f64 {
    let Core {
        neurons,
        axons_out,
        axon_out_hw,
        next_message_generation_delay,
        id: core_id,
        offset,
        ..
    } = core;
    let n = &mut neurons[neuron];
    if !n.axon_out_input_spike {
        return 0.0;
    }

    let unit = &mut axon_out_hw[n.axon_out_hw];
    let (tile_id, tile_x, tile_y) = tile;
    let src = Endpoint {
        tile: tile_id,
        core: *core_id,
        core_offset: *offset,
        x: tile_x,
        y: tile_y,
    };
    trace!(neuron = %n.id, axons = n.axon_out_addresses.len(), "sending spike messages");
    for &axon_address in &n.axon_out_addresses {
        let axon = axons_out[axon_address];
        let dest = index.endpoint(axon.dest_tile_id, axon.dest_core_offset);
        let mut m = Message::spike(n.id.clone(), src, dest, axon.dest_axon_id, ts.timestep);
        // The first message of the batch claims all accumulated
        // neuron-processing latency; later ones carry only axon-out cost.
        m.generation_delay = *next_message_generation_delay + unit.latency_access;
        *next_message_generation_delay = 0.0;
        ts.messages[*core_id].push_back(m);
        unit.packets_out += 1;
        unit.energy += unit.energy_access;
    }
    n.axon_out_input_spike = false;

    unit.latency_access
}
