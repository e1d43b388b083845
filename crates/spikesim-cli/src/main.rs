//! `spikesim` — command-line front-end for the neuromorphic simulator.
//!
//! ```text
//! USAGE:
//!   spikesim run <workload>          Simulate a built-in workload
//!   spikesim list                    List built-in workloads
//! ```
//!
//! Architecture and network files are handled by external front-ends; this
//! binary drives the programmatic surface with built-in workloads.

use anyhow::Result;
use clap::{Parser, Subcommand};
use spikesim_chip::zoo::{self, UnitCosts};
use spikesim_chip::SpikingChip;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spikesim", about = "Spiking-neuromorphic chip simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Simulate a built-in workload.
    Run {
        /// Workload name (see `spikesim list`).
        workload: String,
        /// Timesteps to simulate.
        #[arg(long, default_value_t = 1000)]
        timesteps: i64,
        /// Mesh width, in tiles.
        #[arg(long, default_value_t = 4)]
        width: usize,
        /// Mesh height, in tiles.
        #[arg(long, default_value_t = 4)]
        height: usize,
        /// Cores per tile.
        #[arg(long, default_value_t = 4)]
        cores: usize,
        /// Output directory for traces and the run summary.
        #[arg(long, default_value = "sim_out")]
        out_dir: String,
        /// Heartbeat interval, in timesteps.
        #[arg(long, default_value_t = 100)]
        heartbeat: i64,
        /// Record the spike trace (spikes.csv).
        #[arg(long)]
        record_spikes: bool,
        /// Record the potential trace (potentials.csv).
        #[arg(long)]
        record_potentials: bool,
        /// Record per-timestep performance (perf.csv).
        #[arg(long)]
        record_perf: bool,
        /// Record the message schedule (messages.csv).
        #[arg(long)]
        record_messages: bool,
    },
    /// List built-in workloads.
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Cmd::Run {
            workload,
            timesteps,
            width,
            height,
            cores,
            out_dir,
            heartbeat,
            record_spikes,
            record_potentials,
            record_perf,
            record_messages,
        } => cmd_run(&RunArgs {
            workload,
            timesteps,
            width,
            height,
            cores,
            out_dir,
            heartbeat,
            record_spikes,
            record_potentials,
            record_perf,
            record_messages,
        }),
        Cmd::List => {
            println!("self_loop     one biased neuron spiking to itself every timestep");
            println!("feed_forward  biased input layer fully connected to an output layer");
            Ok(())
        }
    }
}

struct RunArgs {
    workload: String,
    timesteps: i64,
    width: usize,
    height: usize,
    cores: usize,
    out_dir: String,
    heartbeat: i64,
    record_spikes: bool,
    record_potentials: bool,
    record_perf: bool,
    record_messages: bool,
}

fn cmd_run(args: &RunArgs) -> Result<()> {
    let arch = zoo::grid_architecture(args.width, args.height, args.cores, &UnitCosts::default())?;
    let net = match args.workload.as_str() {
        "self_loop" => zoo::self_loop_network()?,
        "feed_forward" => {
            let mut net = zoo::feed_forward_network(64, 64, 1.0)?;
            zoo::map_round_robin(&mut net, &arch)?;
            net
        }
        other => anyhow::bail!("unknown workload: {other} (try `spikesim list`)"),
    };

    let mut chip = SpikingChip::new(
        &arch,
        &args.out_dir,
        args.record_spikes,
        args.record_potentials,
        args.record_perf,
        args.record_messages,
    )?;
    chip.load(&net)?;
    let run = chip.sim(args.timesteps, args.heartbeat)?;

    println!("Workload   : {}", args.workload);
    println!("Mesh       : {}x{} tiles, {} cores/tile", args.width, args.height, args.cores);
    println!("Timesteps  : {}", run.timesteps_executed);
    println!("Energy     : {:.4e} J", run.energy);
    println!("Sim time   : {:.4e} s", run.sim_time);
    println!("Wall time  : {:.3} s", run.wall_time);
    println!("Spikes     : {}", run.spikes);
    println!("Packets    : {}", run.packets_sent);
    println!("Fired      : {}", run.neurons_fired);
    println!("Mean power : {:.4e} W", chip.get_power());
    println!();
    println!("Summary written to {}/run_summary.yaml", args.out_dir);
    Ok(())
}
