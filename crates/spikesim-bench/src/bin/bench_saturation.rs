//! NoC saturation sweep — many senders flooding one destination core.
//!
//! All source neurons sit on core 0 of a 1-D row mesh and fire into the far
//! end every timestep. Past the route's buffer capacity the density-based
//! backpressure kicks in and the per-timestep latency grows super-linearly
//! with sender count.
//!
//! Usage:
//!   cargo run --bin bench_saturation
//!   cargo run --bin bench_saturation -- --tiles 8 --timesteps 200

use anyhow::Result;
use spikesim_chip::zoo::{self, ChipTemplate, UnitCosts};
use spikesim_chip::SpikingChip;
use spikesim_net::{CoreLocation, NeuronId, SpikingNetwork};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_TILES: usize = 8;
const DEFAULT_TIMESTEPS: i64 = 100;
const DEFAULT_BUFFER_SIZE: usize = 4;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let tiles = parse_arg(&args, "--tiles", DEFAULT_TILES);
    let timesteps = parse_arg(&args, "--timesteps", DEFAULT_TIMESTEPS as usize) as i64;
    let buffer_size = parse_arg(&args, "--buffer-size", DEFAULT_BUFFER_SIZE);

    println!("NoC saturation sweep");
    println!("====================");
    println!("Mesh         : {tiles}x1 tiles, 1 core/tile");
    println!("Route        : core 0 -> core {}", tiles - 1);
    println!("Buffer size  : {buffer_size} messages/link");
    println!("Timesteps    : {timesteps}");
    println!();
    println!(
        "  {:>8}  {:>14}  {:>14}  {:>12}",
        "senders", "sim_time/step", "energy/step", "wall [ms]"
    );

    let mut baseline_per_step = 0.0;
    for &senders in &[1_usize, 2, 4, 8, 16, 32, 64] {
        let (sim_time, energy, wall_ms) = run_flood(tiles, buffer_size, senders, timesteps)?;
        let per_step = sim_time / timesteps as f64;
        if senders == 1 {
            baseline_per_step = per_step;
        }
        let vs_linear = per_step / (baseline_per_step * senders as f64);
        println!(
            "  {:>8}  {:>12.3e}s  {:>12.3e}J  {:>12.1}  ({vs_linear:.2}x linear)",
            senders,
            per_step,
            energy / timesteps as f64,
            wall_ms
        );
    }

    println!();
    println!("Ratios above 1.00x linear indicate backpressure stalls on the shared route.");
    Ok(())
}

fn run_flood(
    tiles: usize,
    buffer_size: usize,
    senders: usize,
    timesteps: i64,
) -> Result<(f64, f64, f64)> {
    let arch = zoo::architecture(&ChipTemplate {
        width: tiles,
        height: 1,
        cores_per_tile: 1,
        noc_buffer_size: buffer_size,
        costs: UnitCosts::default(),
        ..ChipTemplate::default()
    })?;

    let mut net = SpikingNetwork::new();
    let group = net.create_group("src", senders)?;
    group.default_attributes.insert("bias".into(), 1.0.into());
    group
        .default_attributes
        .insert("threshold".into(), 0.5.into());
    let group = net.create_group("sink", senders)?;
    group
        .default_attributes
        .insert("threshold".into(), f64::MAX.into());

    for i in 0..senders {
        let pre = NeuronId {
            group: "src".into(),
            id: i,
        };
        let post = NeuronId {
            group: "sink".into(),
            id: i,
        };
        net.connect(pre.clone(), post.clone(), 1.0)?;
        net.map_neuron(
            &pre,
            CoreLocation {
                tile: 0,
                core_offset: 0,
            },
        )?;
        net.map_neuron(
            &post,
            CoreLocation {
                tile: tiles - 1,
                core_offset: 0,
            },
        )?;
    }

    let mut chip = SpikingChip::new(&arch, "bench_out", false, false, false, false)?;
    chip.load(&net)?;
    let t0 = Instant::now();
    let run = chip.sim(timesteps, timesteps)?;
    Ok((run.sim_time, run.energy, t0.elapsed().as_secs_f64() * 1e3))
}

fn parse_arg(args: &[String], flag: &str, default: usize) -> usize {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
