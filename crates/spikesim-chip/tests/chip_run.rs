//! End-to-end chip runs: traces, summaries, determinism, reset, errors.

use spikesim_chip::zoo::{self, UnitCosts};
use spikesim_chip::{SimError, SpikingChip};
use spikesim_net::SpikingNetwork;
use tempfile::TempDir;

fn demo_chip(out: &TempDir, record_all: bool) -> SpikingChip {
    let arch = zoo::grid_architecture(2, 1, 2, &UnitCosts::default()).unwrap();
    let mut net = zoo::feed_forward_network(4, 4, 1.0).unwrap();
    zoo::map_round_robin(&mut net, &arch).unwrap();
    for group in &mut net.groups {
        group.default_log_spikes = record_all;
        group.default_log_potential = record_all;
    }
    let mut chip = SpikingChip::new(
        &arch,
        out.path(),
        record_all,
        record_all,
        record_all,
        record_all,
    )
    .unwrap();
    chip.load(&net).unwrap();
    chip
}

#[test]
fn run_produces_traces_and_summary() {
    let out = TempDir::new().unwrap();
    let mut chip = demo_chip(&out, true);
    let timesteps = 5;
    let run = chip.sim(timesteps, 2).unwrap();
    assert!(run.energy > 0.0);
    assert!(run.sim_time > 0.0);
    assert!(run.spikes > 0);

    let spikes = std::fs::read_to_string(out.path().join("spikes.csv")).unwrap();
    assert!(spikes.starts_with("gid.nid,timestep\n"));
    assert!(spikes.lines().count() > 1, "input neurons fire every step");

    let potentials = std::fs::read_to_string(out.path().join("potentials.csv")).unwrap();
    let header = potentials.lines().next().unwrap();
    assert!(header.contains("in.0,"));
    assert!(header.contains("out.3,"));
    // Header plus one row per timestep.
    assert_eq!(potentials.lines().count(), 1 + timesteps as usize);

    let perf = std::fs::read_to_string(out.path().join("perf.csv")).unwrap();
    assert!(perf.starts_with("timestep,fired,packets,hops,total_energy\n"));
    assert_eq!(perf.lines().count(), 1 + timesteps as usize);

    let messages = std::fs::read_to_string(out.path().join("messages.csv")).unwrap();
    assert_eq!(messages.lines().count() as u64, 1 + run.packets_sent);

    let summary: serde_yaml::Value = serde_yaml::from_str(
        &std::fs::read_to_string(out.path().join("run_summary.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["timesteps"].as_i64().unwrap(), timesteps);
    assert!(summary["energy"].as_f64().unwrap() > 0.0);
    assert_eq!(
        summary["packets_sent"].as_u64().unwrap(),
        run.packets_sent
    );
}

#[test]
fn identical_runs_replay_byte_identical_traces() {
    let out_a = TempDir::new().unwrap();
    let out_b = TempDir::new().unwrap();
    let mut chip_a = demo_chip(&out_a, true);
    let mut chip_b = demo_chip(&out_b, true);

    let run_a = chip_a.sim(20, 100).unwrap();
    let run_b = chip_b.sim(20, 100).unwrap();

    assert_eq!(run_a.energy, run_b.energy);
    assert_eq!(run_a.sim_time, run_b.sim_time);
    assert_eq!(run_a.spikes, run_b.spikes);
    assert_eq!(run_a.packets_sent, run_b.packets_sent);
    assert_eq!(run_a.neurons_fired, run_b.neurons_fired);

    let trace_a = std::fs::read(out_a.path().join("messages.csv")).unwrap();
    let trace_b = std::fs::read(out_b.path().join("messages.csv")).unwrap();
    assert_eq!(trace_a, trace_b, "message traces must replay byte-identical");
}

#[test]
fn reset_rewinds_to_timestep_zero() {
    let out = TempDir::new().unwrap();
    let mut chip = demo_chip(&out, false);

    let first = chip.sim(10, 100).unwrap();
    assert_eq!(first.timestep_start, 1);
    chip.reset();
    let second = chip.sim(10, 100).unwrap();

    assert_eq!(second.timestep_start, 1);
    assert_eq!(first.energy, second.energy);
    assert_eq!(first.sim_time, second.sim_time);
    assert_eq!(first.spikes, second.spikes);
    assert_eq!(first.neurons_fired, second.neurons_fired);
}

#[test]
fn run_totals_accumulate_across_sim_calls() {
    let out = TempDir::new().unwrap();
    let mut chip = demo_chip(&out, false);

    let first = chip.sim(5, 100).unwrap();
    let second = chip.sim(5, 100).unwrap();
    assert_eq!(second.timestep_start, 6);

    let totals = chip.get_run_summary();
    assert_eq!(totals.timesteps_executed, 10);
    assert_eq!(totals.spikes, first.spikes + second.spikes);
    assert!(totals.energy > first.energy);
    assert!(chip.get_power() > 0.0);
}

#[test]
fn unknown_model_fails_at_construction() {
    let out = TempDir::new().unwrap();
    let mut arch = zoo::grid_architecture(1, 1, 1, &UnitCosts::default()).unwrap();
    arch.tiles[0].cores[0].somas[0].model = "hodgkin_huxley_gpu".into();
    let err = SpikingChip::new(&arch, out.path(), false, false, false, false).unwrap_err();
    assert!(matches!(err, SimError::UnknownModel { kind: "soma", .. }));
}

#[test]
fn unmapped_neuron_fails_at_load() {
    let out = TempDir::new().unwrap();
    let arch = zoo::grid_architecture(1, 1, 1, &UnitCosts::default()).unwrap();
    let mut net = SpikingNetwork::new();
    net.create_group("floating", 1).unwrap();

    let mut chip = SpikingChip::new(&arch, out.path(), false, false, false, false).unwrap();
    let err = chip.load(&net).unwrap_err();
    assert!(matches!(err, SimError::NeuronNotMapped { .. }));
}

#[test]
fn mapping_to_missing_core_fails_at_load() {
    let out = TempDir::new().unwrap();
    let arch = zoo::grid_architecture(1, 1, 1, &UnitCosts::default()).unwrap();
    let mut net = zoo::self_loop_network().unwrap();
    net.groups[0].neurons[0].mapping = Some(spikesim_net::CoreLocation {
        tile: 3,
        core_offset: 0,
    });

    let mut chip = SpikingChip::new(&arch, out.path(), false, false, false, false).unwrap();
    let err = chip.load(&net).unwrap_err();
    assert!(matches!(
        err,
        SimError::NoSuchCore {
            tile: 3,
            core_offset: 0
        }
    ));
}

#[test]
fn sim_before_load_is_rejected() {
    let out = TempDir::new().unwrap();
    let arch = zoo::grid_architecture(1, 1, 1, &UnitCosts::default()).unwrap();
    let mut chip = SpikingChip::new(&arch, out.path(), false, false, false, false).unwrap();
    assert!(matches!(chip.sim(1, 100), Err(SimError::NotLoaded)));
}
