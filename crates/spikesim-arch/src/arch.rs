//! Architecture description: tiles, cores and the pipeline buffer position.
//!
//! An [`Architecture`] is the post-parse result handed to the simulator.
//! The file parser lives outside this workspace; here we only validate the
//! structural invariants (mesh capacity, unique tile positions) and offer
//! builder-style helpers so tests and demo workloads can construct
//! architectures programmatically.

use crate::mesh::NocTopology;
use crate::units::{
    AxonInConfiguration, AxonOutConfiguration, DendriteConfiguration, SomaConfiguration,
    SynapseConfiguration,
};
use std::str::FromStr;
use thiserror::Error;

/// Result type alias for architecture construction.
pub type Result<T> = std::result::Result<T, ArchError>;

/// Errors raised while assembling an architecture description.
#[derive(Debug, Error)]
pub enum ArchError {
    /// Buffer-position string not recognised.
    #[error("buffer position not supported: {position}")]
    InvalidBufferPosition {
        /// The offending string.
        position: String,
    },

    /// More tiles than the mesh has grid positions.
    #[error("tile count {tiles} exceeds mesh capacity {width}x{height}")]
    MeshOverflow {
        /// Tiles requested.
        tiles: usize,
        /// Mesh width.
        width: usize,
        /// Mesh height.
        height: usize,
    },

    /// Two tiles claim the same grid position.
    #[error("duplicate tile position ({x}, {y})")]
    DuplicateTilePosition {
        /// Grid x.
        x: usize,
        /// Grid y.
        y: usize,
    },
}

/// Pipeline stage at which a core's per-neuron work ends and per-spike work
/// begins.
///
/// Ordering matters: stages at or after the buffer run once per neuron per
/// timestep, stages strictly before it run once per incoming spike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BufferPosition {
    /// Buffer feeds the dendrite unit; spikes stop after the synapse stage.
    BeforeDendrite,
    /// Buffer feeds the soma unit; spikes run synapse + dendrite stages.
    BeforeSoma,
    /// Buffer feeds the axon-out unit; spikes run through the soma stage.
    BeforeAxonOut,
}

impl FromStr for BufferPosition {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dendrite" => Ok(Self::BeforeDendrite),
            "soma" => Ok(Self::BeforeSoma),
            "axon_out" => Ok(Self::BeforeAxonOut),
            other => Err(ArchError::InvalidBufferPosition {
                position: other.to_string(),
            }),
        }
    }
}

/// Per-core pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct CorePipelineConfiguration {
    /// Where the timestep buffer sits in the unit chain.
    pub buffer_position: BufferPosition,
}

impl Default for CorePipelineConfiguration {
    fn default() -> Self {
        Self {
            buffer_position: BufferPosition::BeforeSoma,
        }
    }
}

/// One core of a tile: its unit stack and pipeline configuration.
#[derive(Debug, Clone)]
pub struct CoreConfiguration {
    /// Core name (diagnostics only).
    pub name: String,
    /// Pipeline buffer placement.
    pub pipeline: CorePipelineConfiguration,
    /// Axon-in units, in hardware order.
    pub axon_in: Vec<AxonInConfiguration>,
    /// Synapse units, in hardware order.
    pub synapses: Vec<SynapseConfiguration>,
    /// Dendrite units, in hardware order.
    pub dendrites: Vec<DendriteConfiguration>,
    /// Soma units, in hardware order.
    pub somas: Vec<SomaConfiguration>,
    /// Axon-out units, in hardware order.
    pub axon_out: Vec<AxonOutConfiguration>,
}

/// One tile of the mesh: grid position, hop costs, resident cores.
#[derive(Debug, Clone)]
pub struct TileConfiguration {
    /// Tile name (diagnostics only).
    pub name: String,
    /// Grid x position.
    pub x: usize,
    /// Grid y position.
    pub y: usize,
    /// Energy per hop leaving this tile northwards, in Joules.
    pub energy_north_hop: f64,
    /// Latency per hop leaving this tile northwards, in seconds.
    pub latency_north_hop: f64,
    /// Energy per eastward hop.
    pub energy_east_hop: f64,
    /// Latency per eastward hop.
    pub latency_east_hop: f64,
    /// Energy per southward hop.
    pub energy_south_hop: f64,
    /// Latency per southward hop.
    pub latency_south_hop: f64,
    /// Energy per westward hop.
    pub energy_west_hop: f64,
    /// Latency per westward hop.
    pub latency_west_hop: f64,
    /// Cores on this tile, in offset order.
    pub cores: Vec<CoreConfiguration>,
}

impl TileConfiguration {
    /// Tile with uniform hop costs in every direction.
    #[must_use]
    pub fn uniform(name: impl Into<String>, x: usize, y: usize, energy_hop: f64, latency_hop: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            energy_north_hop: energy_hop,
            latency_north_hop: latency_hop,
            energy_east_hop: energy_hop,
            latency_east_hop: latency_hop,
            energy_south_hop: energy_hop,
            latency_south_hop: latency_hop,
            energy_west_hop: energy_hop,
            latency_west_hop: latency_hop,
            cores: Vec::new(),
        }
    }
}

/// Complete architecture description: the NoC plus its tiles.
#[derive(Debug, Clone)]
pub struct Architecture {
    /// Design name (diagnostics and run summaries).
    pub name: String,
    /// Mesh dimensions and router buffering. `max_cores_per_tile` is
    /// recomputed by [`Architecture::validated`].
    pub noc: NocTopology,
    /// Tiles in id order.
    pub tiles: Vec<TileConfiguration>,
}

impl Architecture {
    /// Validate mesh capacity and tile-position uniqueness, and derive
    /// `max_cores_per_tile` from the tile list.
    ///
    /// # Errors
    ///
    /// Returns [`ArchError::MeshOverflow`] or
    /// [`ArchError::DuplicateTilePosition`] on structural inconsistencies.
    pub fn validated(mut self) -> Result<Self> {
        if self.tiles.len() > self.noc.width * self.noc.height {
            return Err(ArchError::MeshOverflow {
                tiles: self.tiles.len(),
                width: self.noc.width,
                height: self.noc.height,
            });
        }
        let mut positions: Vec<(usize, usize)> =
            self.tiles.iter().map(|t| (t.x, t.y)).collect();
        positions.sort_unstable();
        for pair in positions.windows(2) {
            if pair[0] == pair[1] {
                return Err(ArchError::DuplicateTilePosition {
                    x: pair[0].0,
                    y: pair[0].1,
                });
            }
        }
        self.noc.max_cores_per_tile = self
            .tiles
            .iter()
            .map(|t| t.cores.len())
            .max()
            .unwrap_or(0);
        Ok(self)
    }

    /// Total core count across all tiles.
    #[must_use]
    pub fn core_count(&self) -> usize {
        self.tiles.iter().map(|t| t.cores.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tile_arch() -> Architecture {
        Architecture {
            name: "line".into(),
            noc: NocTopology {
                width: 2,
                height: 1,
                buffer_size: 4,
                max_cores_per_tile: 0,
            },
            tiles: vec![
                TileConfiguration::uniform("tile0", 0, 0, 1e-12, 1e-9),
                TileConfiguration::uniform("tile1", 1, 0, 1e-12, 1e-9),
            ],
        }
    }

    #[test]
    fn buffer_position_parsing() {
        assert_eq!(
            "dendrite".parse::<BufferPosition>().unwrap(),
            BufferPosition::BeforeDendrite
        );
        assert_eq!(
            "soma".parse::<BufferPosition>().unwrap(),
            BufferPosition::BeforeSoma
        );
        assert_eq!(
            "axon_out".parse::<BufferPosition>().unwrap(),
            BufferPosition::BeforeAxonOut
        );
        assert!("axon_in".parse::<BufferPosition>().is_err());
    }

    #[test]
    fn buffer_positions_are_ordered() {
        assert!(BufferPosition::BeforeDendrite < BufferPosition::BeforeSoma);
        assert!(BufferPosition::BeforeSoma < BufferPosition::BeforeAxonOut);
    }

    #[test]
    fn validation_accepts_line_mesh() {
        let arch = two_tile_arch().validated().unwrap();
        assert_eq!(arch.core_count(), 0);
        assert_eq!(arch.noc.max_cores_per_tile, 0);
    }

    #[test]
    fn validation_rejects_overflow() {
        let mut arch = two_tile_arch();
        arch.noc.width = 1;
        assert!(matches!(
            arch.validated(),
            Err(ArchError::MeshOverflow { .. })
        ));
    }

    #[test]
    fn validation_rejects_duplicate_position() {
        let mut arch = two_tile_arch();
        arch.tiles[1].x = 0;
        assert!(matches!(
            arch.validated(),
            Err(ArchError::DuplicateTilePosition { x: 0, y: 0 })
        ));
    }
}
