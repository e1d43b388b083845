//! Global NoC message scheduler.
//!
//! Takes the per-core message FIFOs produced by the pipeline and computes a
//! total order with send/receive/process timestamps. Rather than replaying
//! flits, the scheduler maintains an analytical *density* field over NoC
//! links: every in-flight message spreads exactly 1.0 of occupancy across
//! its route (source local link, one directional link per hop in X-then-Y
//! order, destination local link). The summed density along a route serves
//! both as a backpressure signal that delays over-subscribed sends and as a
//! multiplier on the rolling mean receive delay that models dynamic network
//! delay.

use crate::message::Message;
use spikesim_arch::{Direction, NocTopology};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use tracing::trace;

/// Density may drift very slightly below zero through float cancellation.
const DENSITY_EPSILON: f64 = 0.1;

/// Heap entry ordered for a min-heap on `(sent_timestamp, src_core_id)`.
/// The core-id tie-break keeps pop order total, so runs are reproducible.
struct Pending(Message);

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .sent_timestamp
            .total_cmp(&self.0.sent_timestamp)
            .then_with(|| other.0.src_core_id.cmp(&self.0.src_core_id))
    }
}

/// A message currently occupying NoC links, kept until the simulated clock
/// passes its receive time.
struct InFlight {
    received_timestamp: f64,
    receive_delay: f64,
    links: Vec<usize>,
}

/// Scheduler working state. Lives only for the duration of one
/// [`schedule_messages`] call.
struct NocInfo {
    topo: NocTopology,
    message_density: Vec<f64>,
    messages_received: Vec<Vec<InFlight>>,
    core_finished_receiving: Vec<f64>,
    messages_in_noc: u64,
    mean_in_flight_receive_delay: f64,
}

impl NocInfo {
    fn new(topo: NocTopology, core_count: usize) -> Self {
        Self {
            topo,
            message_density: vec![0.0; topo.total_links()],
            messages_received: (0..core_count).map(|_| Vec::new()).collect(),
            core_finished_receiving: vec![0.0; core_count],
            messages_in_noc: 0,
            mean_in_flight_receive_delay: 0.0,
        }
    }

    fn density_total(&self) -> f64 {
        self.message_density.iter().sum()
    }
}

/// Links charged by a message, in route order: source local link, one
/// directional link per X hop then per Y hop (dimension-ordered, charged at
/// the tile being entered), destination local link. Always `hops + 2`
/// entries, so an adjustment of `1 / links.len()` per link sums to exactly
/// one message.
fn route_links(topo: &NocTopology, m: &Message) -> Vec<usize> {
    let mut links = Vec::with_capacity(m.hops + 2);
    links.push(topo.local_link_index(m.src_x, m.src_y, m.src_core_offset));

    let x_dir = if m.src_x < m.dest_x {
        Direction::East
    } else {
        Direction::West
    };
    let mut x = m.src_x;
    while x != m.dest_x {
        x = if m.src_x < m.dest_x { x + 1 } else { x - 1 };
        links.push(topo.link_index(x, m.src_y, x_dir.index()));
    }

    let y_dir = if m.src_y < m.dest_y {
        Direction::North
    } else {
        Direction::South
    };
    let mut y = m.src_y;
    while y != m.dest_y {
        y = if m.src_y < m.dest_y { y + 1 } else { y - 1 };
        links.push(topo.link_index(m.dest_x, y, y_dir.index()));
    }

    links.push(topo.local_link_index(m.dest_x, m.dest_y, m.dest_core_offset));
    links
}

/// Summed density over the links a message will traverse.
fn density_along_route(noc: &NocInfo, links: &[usize]) -> f64 {
    let density: f64 = links.iter().map(|&l| noc.message_density[l]).sum();
    debug_assert!(density >= -DENSITY_EPSILON);
    density
}

/// Account for one message entering the NoC: add density along its route
/// and fold its receive delay into the rolling mean.
fn enter_noc(noc: &mut NocInfo, links: &[usize], receive_delay: f64) {
    let adjust = 1.0 / links.len() as f64;
    for &l in links {
        noc.message_density[l] += adjust;
    }
    noc.mean_in_flight_receive_delay += (receive_delay - noc.mean_in_flight_receive_delay)
        / (noc.messages_in_noc as f64 + 1.0);
    noc.messages_in_noc += 1;
}

/// Remove every in-flight message fully received by time `t`, subtracting
/// its density and backing its receive delay out of the rolling mean.
fn update_noc(t: f64, noc: &mut NocInfo) {
    let NocInfo {
        message_density,
        messages_received,
        messages_in_noc,
        mean_in_flight_receive_delay,
        ..
    } = noc;
    for q in messages_received.iter_mut() {
        let mut i = 0;
        while i < q.len() {
            if t >= q[i].received_timestamp {
                let m = q.swap_remove(i);
                let adjust = -1.0 / m.links.len() as f64;
                for &l in &m.links {
                    message_density[l] += adjust;
                }
                if *messages_in_noc > 1 {
                    *mean_in_flight_receive_delay += (*mean_in_flight_receive_delay
                        - m.receive_delay)
                        / (*messages_in_noc as f64 - 1.0);
                } else {
                    *mean_in_flight_receive_delay = 0.0;
                }
                *messages_in_noc -= 1;
            } else {
                i += 1;
            }
        }
    }
}

/// Schedule the global order of one timestep's messages.
///
/// `queues` holds one FIFO per core, placeholders included. Returns the
/// timestamp of the last scheduled event (the timestep's simulated
/// duration) and every message, annotated, in pop order.
#[must_use]
pub fn schedule_messages(
    topo: &NocTopology,
    core_count: usize,
    mut queues: Vec<VecDeque<Message>>,
) -> (f64, Vec<Message>) {
    debug_assert_eq!(queues.len(), core_count);
    let mut noc = NocInfo::new(*topo, core_count);
    let mut scheduled = Vec::with_capacity(queues.iter().map(VecDeque::len).sum());

    // Seed the priority queue with each core's first message.
    let mut priority = BinaryHeap::with_capacity(core_count);
    for q in &mut queues {
        if let Some(mut m) = q.pop_front() {
            m.sent_timestamp = m.generation_delay;
            priority.push(Pending(m));
        }
    }

    let mut last_timestamp = 0.0_f64;
    while let Some(Pending(mut m)) = priority.pop() {
        last_timestamp = last_timestamp.max(m.sent_timestamp);

        // Retire everything the NoC has finished delivering by now.
        update_noc(m.sent_timestamp, &mut noc);

        if !m.placeholder {
            let dest = m.dest_core_id;
            let links = route_links(&noc.topo, &m);
            let along_route = density_along_route(&noc, &links);

            // Backpressure: a route holding more messages than its buffers
            // can seat delays the send.
            let path_capacity = ((m.hops + 1) * noc.topo.buffer_size) as f64;
            if along_route > path_capacity {
                let stall =
                    (along_route - path_capacity) * noc.mean_in_flight_receive_delay;
                m.blocked_delay += stall;
                m.sent_timestamp += stall;
            }

            m.in_noc = true;
            enter_noc(&mut noc, &links, m.receive_delay);

            let dynamic_delay = along_route * noc.mean_in_flight_receive_delay
                / (m.hops as f64 + 1.0);
            trace!(
                src = m.src_core_id,
                dest,
                along_route,
                path_capacity,
                dynamic_delay,
                "scheduling message"
            );

            let earliest_received = m.sent_timestamp + m.network_delay.max(dynamic_delay);
            m.received_timestamp =
                noc.core_finished_receiving[dest].max(earliest_received);
            noc.core_finished_receiving[dest] = m.received_timestamp + m.receive_delay;
            m.processed_timestamp = noc.core_finished_receiving[dest];
            last_timestamp = last_timestamp.max(m.processed_timestamp);

            noc.messages_received[dest].push(InFlight {
                received_timestamp: m.received_timestamp,
                receive_delay: m.receive_delay,
                links,
            });
        }

        // Re-arm this core with its next message, sent back-to-back after
        // the current one.
        if let Some(mut next) = queues[m.src_core_id].pop_front() {
            next.sent_timestamp = m.sent_timestamp + next.generation_delay;
            last_timestamp = last_timestamp.max(next.sent_timestamp);
            priority.push(Pending(next));
        }

        scheduled.push(m);
    }

    // Drain remaining NoC residents so the density field returns to zero.
    update_noc(f64::INFINITY, &mut noc);
    debug_assert_eq!(noc.messages_in_noc, 0);
    debug_assert!(noc.density_total().abs() < 1e-9);

    (last_timestamp, scheduled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Endpoint;
    use spikesim_net::NeuronId;

    const TOPO: NocTopology = NocTopology {
        width: 8,
        height: 1,
        buffer_size: 4,
        max_cores_per_tile: 1,
    };

    fn endpoint(tile: usize, x: usize) -> Endpoint {
        Endpoint {
            tile,
            core: tile,
            core_offset: 0,
            x,
            y: 0,
        }
    }

    fn spike(src: usize, dest: usize, generation_delay: f64, receive_delay: f64) -> Message {
        let nid = NeuronId {
            group: "g".into(),
            id: 0,
        };
        let mut m = Message::spike(nid, endpoint(src, src), endpoint(dest, dest), 0, 1);
        m.generation_delay = generation_delay;
        m.receive_delay = receive_delay;
        m
    }

    fn placeholder(src: usize, generation_delay: f64) -> Message {
        let nid = NeuronId {
            group: "g".into(),
            id: 0,
        };
        Message::placeholder(nid, endpoint(src, src), 1, generation_delay)
    }

    fn queues(per_core: Vec<Vec<Message>>) -> Vec<VecDeque<Message>> {
        per_core.into_iter().map(VecDeque::from).collect()
    }

    #[test]
    fn route_charges_hops_plus_two_links() {
        let m = spike(0, 3, 0.0, 0.0);
        let links = route_links(&TOPO, &m);
        assert_eq!(m.hops, 3);
        assert_eq!(links.len(), 5);
        // Source and destination local links bracket the directional hops.
        assert_eq!(links[0], TOPO.local_link_index(0, 0, 0));
        assert_eq!(links[4], TOPO.local_link_index(3, 0, 0));
    }

    #[test]
    fn density_sums_to_messages_in_noc() {
        let mut noc = NocInfo::new(TOPO, 8);
        for dest in [3_usize, 5, 7] {
            let m = spike(0, dest, 0.0, 1e-9);
            let links = route_links(&noc.topo, &m);
            enter_noc(&mut noc, &links, m.receive_delay);
        }
        assert_eq!(noc.messages_in_noc, 3);
        assert!((noc.density_total() - 3.0).abs() < 1e-9);

        update_noc(f64::INFINITY, &mut noc);
        assert_eq!(noc.messages_in_noc, 3, "nothing tracked as received yet");
    }

    #[test]
    fn rolling_mean_tracks_insert_and_remove() {
        let mut noc = NocInfo::new(TOPO, 8);
        let m1 = spike(0, 1, 0.0, 2e-9);
        let m2 = spike(0, 2, 0.0, 4e-9);
        let l1 = route_links(&noc.topo, &m1);
        let l2 = route_links(&noc.topo, &m2);
        enter_noc(&mut noc, &l1, m1.receive_delay);
        assert!((noc.mean_in_flight_receive_delay - 2e-9).abs() < 1e-18);
        enter_noc(&mut noc, &l2, m2.receive_delay);
        assert!((noc.mean_in_flight_receive_delay - 3e-9).abs() < 1e-18);

        noc.messages_received[1].push(InFlight {
            received_timestamp: 0.0,
            receive_delay: m1.receive_delay,
            links: l1,
        });
        update_noc(1.0, &mut noc);
        assert_eq!(noc.messages_in_noc, 1);
        assert!((noc.mean_in_flight_receive_delay - 4e-9).abs() < 1e-18);
    }

    #[test]
    fn timestamps_are_ordered_per_message() {
        let (_, scheduled) = schedule_messages(
            &TOPO,
            8,
            queues(vec![
                vec![spike(0, 3, 1e-9, 2e-9), spike(0, 5, 1e-9, 2e-9)],
                vec![spike(1, 3, 5e-10, 2e-9)],
                vec![],
                vec![placeholder(3, 4e-9)],
                vec![],
                vec![],
                vec![],
                vec![],
            ]),
        );
        assert_eq!(scheduled.len(), 4);
        for m in scheduled.iter().filter(|m| !m.placeholder) {
            assert!(m.sent_timestamp <= m.received_timestamp);
            assert!(m.received_timestamp <= m.processed_timestamp);
        }
    }

    #[test]
    fn destination_receive_order_is_monotonic() {
        let mut makers = Vec::new();
        for src in 0..4_usize {
            makers.push(vec![
                spike(src, 7, 1e-9 * (src as f64 + 1.0), 3e-9),
                spike(src, 7, 1e-9, 3e-9),
            ]);
        }
        for _ in 4..8 {
            makers.push(vec![]);
        }
        let (_, scheduled) = schedule_messages(&TOPO, 8, queues(makers));
        let received: Vec<f64> = scheduled
            .iter()
            .filter(|m| !m.placeholder)
            .map(|m| m.received_timestamp)
            .collect();
        assert_eq!(received.len(), 8);
        for pair in received.windows(2) {
            assert!(pair[0] <= pair[1], "receive order regressed: {pair:?}");
        }
        let processed: Vec<f64> = scheduled.iter().map(|m| m.processed_timestamp).collect();
        for pair in processed.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn sent_timestamps_accumulate_generation_delays() {
        let (last, scheduled) = schedule_messages(
            &TOPO,
            8,
            queues(vec![
                vec![spike(0, 1, 1e-9, 0.0), spike(0, 2, 2e-9, 0.0)],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
            ]),
        );
        assert_eq!(scheduled[0].sent_timestamp, 1e-9);
        assert_eq!(scheduled[1].sent_timestamp, 3e-9);
        assert!(last >= 3e-9);
    }

    #[test]
    fn placeholder_advances_core_clock_only() {
        let (last, scheduled) =
            schedule_messages(&TOPO, 8, queues(vec![
                vec![placeholder(0, 7e-9)],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
            ]));
        assert_eq!(last, 7e-9);
        assert!(scheduled[0].placeholder);
        assert_eq!(scheduled[0].received_timestamp, f64::NEG_INFINITY);
    }

    #[test]
    fn saturation_applies_backpressure() {
        // Everyone fires down the same row into core 7 with tiny buffers.
        let narrow = NocTopology {
            buffer_size: 1,
            ..TOPO
        };
        let flood: Vec<Vec<Message>> = (0..8)
            .map(|src| {
                if src < 7 {
                    (0..8).map(|_| spike(src, 7, 1e-10, 5e-9)).collect()
                } else {
                    vec![]
                }
            })
            .collect();
        let (_, scheduled) = schedule_messages(&narrow, 8, queues(flood));
        let blocked: Vec<&Message> =
            scheduled.iter().filter(|m| m.blocked_delay > 0.0).collect();
        assert!(
            !blocked.is_empty(),
            "an oversubscribed route must delay some sends"
        );
        for m in blocked {
            assert!(m.sent_timestamp >= m.generation_delay);
        }
    }

    #[test]
    fn deterministic_replay() {
        let build = || {
            queues(vec![
                vec![spike(0, 3, 1e-9, 2e-9), spike(0, 4, 1e-9, 2e-9)],
                vec![spike(1, 3, 1e-9, 2e-9)],
                vec![spike(2, 3, 1e-9, 2e-9)],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![placeholder(7, 3e-9)],
            ])
        };
        let (last_a, run_a) = schedule_messages(&TOPO, 8, build());
        let (last_b, run_b) = schedule_messages(&TOPO, 8, build());
        assert_eq!(last_a, last_b);
        let stamps = |run: &[Message]| -> Vec<(usize, f64, f64, f64)> {
            run.iter()
                .map(|m| {
                    (
                        m.src_core_id,
                        m.sent_timestamp,
                        m.received_timestamp,
                        m.processed_timestamp,
                    )
                })
                .collect()
        };
        assert_eq!(stamps(&run_a), stamps(&run_b));
    }

    #[test]
    fn heap_ties_break_by_source_core() {
        let (_, scheduled) = schedule_messages(
            &TOPO,
            8,
            queues(vec![
                vec![spike(0, 7, 1e-9, 0.0)],
                vec![spike(1, 7, 1e-9, 0.0)],
                vec![spike(2, 7, 1e-9, 0.0)],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
            ]),
        );
        let order: Vec<usize> = scheduled.iter().map(|m| m.src_core_id).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn self_loop_route_stays_on_tile() {
        let m = spike(2, 2, 0.0, 0.0);
        let links = route_links(&TOPO, &m);
        assert_eq!(m.hops, 0);
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|&l| l == TOPO.local_link_index(2, 0, 0)));
    }
}
