//! Scheduler ordering and contention invariants, driven through the public
//! scheduling surface and through whole-chip runs.

use spikesim_arch::NocTopology;
use spikesim_chip::schedule::schedule_messages;
use spikesim_chip::zoo::{self, ChipTemplate, UnitCosts};
use spikesim_chip::{Message, SpikingChip};
use spikesim_net::{CoreLocation, NeuronId, SpikingNetwork};
use std::collections::VecDeque;
use tempfile::TempDir;

const ROW: NocTopology = NocTopology {
    width: 8,
    height: 1,
    buffer_size: 2,
    max_cores_per_tile: 1,
};

/// Real message from core `src` to core `dest` on the 8x1 row, one core per
/// tile.
fn spike(src: usize, dest: usize, generation_delay: f64, receive_delay: f64) -> Message {
    Message {
        src_neuron: NeuronId {
            group: "g".into(),
            id: src,
        },
        src_tile_id: src,
        src_core_id: src,
        src_core_offset: 0,
        src_x: src,
        src_y: 0,
        dest_tile_id: dest,
        dest_core_id: dest,
        dest_core_offset: 0,
        dest_x: dest,
        dest_y: 0,
        dest_axon_hw: 0,
        dest_axon_id: 0,
        hops: src.abs_diff(dest),
        spikes: 1,
        timestep: 1,
        placeholder: false,
        generation_delay,
        network_delay: 0.0,
        receive_delay,
        blocked_delay: 0.0,
        sent_timestamp: f64::NEG_INFINITY,
        received_timestamp: f64::NEG_INFINITY,
        processed_timestamp: f64::NEG_INFINITY,
        in_noc: false,
    }
}

fn queues(per_core: Vec<Vec<Message>>) -> Vec<VecDeque<Message>> {
    per_core.into_iter().map(VecDeque::from).collect()
}

fn flood(senders_per_core: usize) -> Vec<VecDeque<Message>> {
    queues(
        (0..8)
            .map(|src| {
                if src < 7 {
                    (0..senders_per_core)
                        .map(|_| spike(src, 7, 1e-10, 5e-9))
                        .collect()
                } else {
                    Vec::new()
                }
            })
            .collect(),
    )
}

#[test]
fn every_message_obeys_timestamp_ordering() {
    let (last, scheduled) = schedule_messages(&ROW, 8, flood(8));
    assert_eq!(scheduled.len(), 56);
    for m in &scheduled {
        assert!(m.sent_timestamp <= m.received_timestamp);
        assert!(m.received_timestamp <= m.processed_timestamp);
        assert!(m.processed_timestamp <= last);
        assert_eq!(m.hops, m.src_x.abs_diff(m.dest_x) + m.src_y.abs_diff(m.dest_y));
    }
}

#[test]
fn per_destination_receive_order_is_monotonic() {
    let (_, scheduled) = schedule_messages(&ROW, 8, flood(8));
    let mut last_received = f64::NEG_INFINITY;
    let mut last_processed = f64::NEG_INFINITY;
    for m in scheduled.iter().filter(|m| m.dest_core_id == 7) {
        assert!(m.received_timestamp >= last_received);
        assert!(m.processed_timestamp >= last_processed);
        last_received = m.received_timestamp;
        last_processed = m.processed_timestamp;
    }
}

#[test]
fn oversubscribed_route_delays_later_sends() {
    let (_, scheduled) = schedule_messages(&ROW, 8, flood(8));
    let blocked: Vec<&Message> = scheduled.iter().filter(|m| m.blocked_delay > 0.0).collect();
    assert!(!blocked.is_empty());
    for m in blocked {
        // The stall is strictly positive and pushes the send past the
        // back-to-back generation schedule.
        assert!(m.sent_timestamp > m.generation_delay);
    }
}

#[test]
fn schedule_replays_identically() {
    let (last_a, run_a) = schedule_messages(&ROW, 8, flood(4));
    let (last_b, run_b) = schedule_messages(&ROW, 8, flood(4));
    assert_eq!(last_a, last_b);
    for (a, b) in run_a.iter().zip(run_b.iter()) {
        assert_eq!(a.src_core_id, b.src_core_id);
        assert_eq!(a.sent_timestamp, b.sent_timestamp);
        assert_eq!(a.received_timestamp, b.received_timestamp);
        assert_eq!(a.processed_timestamp, b.processed_timestamp);
    }
}

/// End to end: a burst into one far core stays free of blocking while the
/// route density fits `(hops + 1) * buffer_size`, and picks up strictly
/// positive backpressure stalls once it does not. Spike generation is made
/// much faster than message receive so each timestep's burst piles into the
/// NoC before the sink drains it.
#[test]
fn saturation_engages_backpressure() {
    // Route core 0 -> core 7: hops = 7, capacity = 8 * 4 = 32 messages.
    let run_flood = |senders: usize| -> (f64, f64) {
        let out = TempDir::new().unwrap();
        let costs = UnitCosts {
            latency_soma_access: 0.01e-9,
            latency_soma_update: 0.01e-9,
            latency_soma_spike: 0.01e-9,
            latency_axon_out: 0.01e-9,
            latency_axon_in: 30.0e-9,
            latency_hop: 1.0e-9,
            ..UnitCosts::default()
        };
        let arch = zoo::architecture(&ChipTemplate {
            width: 8,
            height: 1,
            cores_per_tile: 1,
            noc_buffer_size: 4,
            costs,
            ..ChipTemplate::default()
        })
        .unwrap();

        let mut net = SpikingNetwork::new();
        let group = net.create_group("src", senders).unwrap();
        group.default_attributes.insert("bias".into(), 1.0.into());
        group
            .default_attributes
            .insert("threshold".into(), 0.5.into());
        let group = net.create_group("sink", senders).unwrap();
        group
            .default_attributes
            .insert("threshold".into(), 1e12.into());
        for i in 0..senders {
            let pre = NeuronId {
                group: "src".into(),
                id: i,
            };
            let post = NeuronId {
                group: "sink".into(),
                id: i,
            };
            net.connect(pre.clone(), post.clone(), 1.0).unwrap();
            net.map_neuron(
                &pre,
                CoreLocation {
                    tile: 0,
                    core_offset: 0,
                },
            )
            .unwrap();
            net.map_neuron(
                &post,
                CoreLocation {
                    tile: 7,
                    core_offset: 0,
                },
            )
            .unwrap();
        }

        let mut chip = SpikingChip::new(&arch, out.path(), false, false, false, true).unwrap();
        chip.load(&net).unwrap();
        let timesteps = 5;
        let run = chip.sim(timesteps, 100).unwrap();
        assert_eq!(run.packets_sent, senders as u64 * timesteps as u64);

        let trace = std::fs::read_to_string(out.path().join("messages.csv")).unwrap();
        let max_blocking = trace
            .lines()
            .skip(1)
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                fields[9].parse::<f64>().unwrap()
            })
            .fold(0.0_f64, f64::max);
        (run.sim_time / timesteps as f64, max_blocking)
    };

    let (light_step, light_blocking) = run_flood(16);
    let (heavy_step, heavy_blocking) = run_flood(64);

    assert_eq!(light_blocking, 0.0, "below capacity no send may stall");
    assert!(
        heavy_blocking > 0.0,
        "past capacity some sends must stall"
    );
    assert!(heavy_step > light_step);
}
