//! Mesh-size sweep — fixed workload over growing meshes.
//!
//! The same feed-forward network is spread round-robin across meshes from
//! 1x1 to 8x8 tiles. Larger meshes lengthen routes (more hops, more energy
//! per packet) but spread receive pressure over more cores.
//!
//! Usage:
//!   cargo run --bin bench_mesh_sweep
//!   cargo run --bin bench_mesh_sweep -- --neurons 256 --timesteps 50

use anyhow::Result;
use spikesim_chip::zoo::{self, UnitCosts};
use spikesim_chip::SpikingChip;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_NEURONS: usize = 128;
const DEFAULT_TIMESTEPS: i64 = 100;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let neurons = parse_arg(&args, "--neurons", DEFAULT_NEURONS);
    let timesteps = parse_arg(&args, "--timesteps", DEFAULT_TIMESTEPS as usize) as i64;

    println!("Mesh-size sweep");
    println!("===============");
    println!("Workload   : {neurons}->{neurons} feed-forward, all-to-all");
    println!("Timesteps  : {timesteps}");
    println!();
    println!(
        "  {:>7}  {:>10}  {:>14}  {:>14}  {:>10}",
        "mesh", "cores", "sim_time/step", "energy/step", "wall [ms]"
    );

    for &side in &[1_usize, 2, 4, 8] {
        let arch = zoo::grid_architecture(side, side, 4, &UnitCosts::default())?;
        let mut net = zoo::feed_forward_network(neurons, neurons, 1.0)?;
        zoo::map_round_robin(&mut net, &arch)?;

        let mut chip = SpikingChip::new(&arch, "bench_out", false, false, false, false)?;
        chip.load(&net)?;
        let t0 = Instant::now();
        let run = chip.sim(timesteps, timesteps)?;
        let wall_ms = t0.elapsed().as_secs_f64() * 1e3;

        println!(
            "  {:>4}x{:<2}  {:>10}  {:>12.3e}s  {:>12.3e}J  {:>10.1}",
            side,
            side,
            chip.core_count(),
            run.sim_time / timesteps as f64,
            run.energy / timesteps as f64,
            wall_ms
        );
    }

    Ok(())
}

fn parse_arg(args: &[String], flag: &str, default: usize) -> usize {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
