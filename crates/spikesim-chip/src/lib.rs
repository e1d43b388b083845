//! Cycle-approximate simulation kernel for digital spiking-neuromorphic
//! processors.
//!
//! Given an [`Architecture`](spikesim_arch::Architecture) (a 2-D mesh of
//! tiles holding cores with axon-in, synapse, dendrite, soma and axon-out
//! units) and a [`SpikingNetwork`](spikesim_net::SpikingNetwork) mapped onto
//! it, the kernel estimates per-timestep energy, latency and message counts
//! by walking spike messages through the modeled pipeline. It is an
//! analytical estimator: no functional inference, no flit-level NoC replay.
//!
//! # Kernel structure
//!
//! ```text
//! SpikingChip::sim()
//!   └─ per timestep
//!        ├─ pipeline: neuron-side phase   (once per mapped neuron)
//!        ├─ pipeline: message-side phase  (once per spike message)
//!        ├─ scheduler: global NoC order   (density field + rolling mean)
//!        └─ aggregator: energy + counters → Timestep → RunData
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use spikesim_chip::{SpikingChip, zoo};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let arch = zoo::grid_architecture(2, 2, 1, &zoo::UnitCosts::default())?;
//! let net = zoo::feed_forward_network(4, 4, 1.0)?;
//!
//! let mut chip = SpikingChip::new(&arch, ".", false, false, false, false)?;
//! chip.load(&net)?;
//! let run = chip.sim(1000, 100)?;
//! println!("{:.3e} J over {:.3e} s", run.energy, run.sim_time);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

mod chip;
mod error;
pub mod hardware;
pub mod mapping;
pub mod message;
pub mod models;
mod pipeline;
pub mod schedule;
mod timestep;
mod trace;
pub mod zoo;

pub use chip::{RunData, SpikingChip};
pub use error::{Result, SimError};
pub use message::Message;
pub use models::{NeuronStatus, SomaResult, SynapseResult};
pub use timestep::Timestep;

/// Commonly used types.
pub mod prelude {
    pub use crate::{Message, NeuronStatus, Result, RunData, SimError, SpikingChip, Timestep};
    pub use spikesim_arch::{Architecture, BufferPosition, NocTopology};
    pub use spikesim_net::{CoreLocation, NeuronId, SpikingNetwork};
}
