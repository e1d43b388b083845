//! Hardware description model for spikesim.
//!
//! This crate has **no simulation logic** — it is a pure model of the
//! processor being estimated: the 2-D tile mesh, the NoC link layout, and
//! the per-unit energy/latency metrics that the kernel charges against.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`mesh`] | NoC topology, link indexing, Manhattan hop math |
//! | [`units`] | Per-unit configuration: axon-in/out costs, synapse/dendrite/soma metrics |
//! | [`arch`] | Tile/core configuration records and the [`arch::Architecture`] root |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod arch;
pub mod mesh;
pub mod units;

pub use arch::{
    ArchError, Architecture, BufferPosition, CoreConfiguration, CorePipelineConfiguration,
    Result, TileConfiguration,
};
pub use mesh::{Direction, NocTopology, NDIRECTIONS};
pub use units::{
    AxonInConfiguration, AxonOutConfiguration, DendriteConfiguration, SomaConfiguration,
    SomaEnergyMetrics, SomaLatencyMetrics, SynapseConfiguration,
};
