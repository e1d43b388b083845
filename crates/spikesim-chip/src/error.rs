//! Error types for the simulation kernel.
//!
//! Every variant is fatal: the kernel never retries, never partially
//! commits, and the owning [`SpikingChip`](crate::SpikingChip) should be
//! dropped after an error.

use thiserror::Error;

/// Result type alias for kernel operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised during chip construction, loading or simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid architecture description.
    #[error(transparent)]
    Arch(#[from] spikesim_arch::ArchError),

    /// Invalid network description or attribute coercion failure.
    #[error(transparent)]
    Network(#[from] spikesim_net::NetworkError),

    /// A unit configuration named a model the registry does not know.
    #[error("unknown {kind} model: {name}")]
    UnknownModel {
        /// Unit kind ("synapse", "dendrite", "soma").
        kind: &'static str,
        /// Requested model name.
        name: String,
    },

    /// A neuron had no core mapping at `load()`.
    #[error("neuron {neuron} is not mapped to any core")]
    NeuronNotMapped {
        /// Neuron identity.
        neuron: String,
    },

    /// A mapping referenced a tile/core that does not exist.
    #[error("no core at tile {tile} offset {core_offset}")]
    NoSuchCore {
        /// Tile id.
        tile: usize,
        /// Core offset within the tile.
        core_offset: usize,
    },

    /// A group or connection named a hardware unit absent from its core.
    #[error("core {core} has no {kind} unit named {unit}")]
    UnitNotFound {
        /// Core name.
        core: String,
        /// Unit kind.
        kind: &'static str,
        /// Requested unit name.
        unit: String,
    },

    /// Simulation requested before a network was loaded.
    #[error("no network loaded; call load() before sim()")]
    NotLoaded,

    /// Trace or summary file I/O failure.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying error.
        #[from]
        source: std::io::Error,
    },
}

impl SimError {
    /// Create an unknown-model error.
    pub fn unknown_model(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownModel {
            kind,
            name: name.into(),
        }
    }

    /// Create an unmapped-neuron error.
    pub fn neuron_not_mapped(neuron: impl ToString) -> Self {
        Self::NeuronNotMapped {
            neuron: neuron.to_string(),
        }
    }

    /// Create a missing-unit error.
    pub fn unit_not_found(
        core: impl Into<String>,
        kind: &'static str,
        unit: impl Into<String>,
    ) -> Self {
        Self::UnitNotFound {
            core: core.into(),
            kind,
            unit: unit.into(),
        }
    }
}
