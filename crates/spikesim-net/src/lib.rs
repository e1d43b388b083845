//! Spiking-network model for spikesim.
//!
//! The network file parser is an external collaborator; this crate holds its
//! *result*: neuron groups with shared defaults, per-neuron attribute
//! overrides, a flat connection list, and the explicit neuron-to-core
//! mapping the simulator realises at load time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod attribute;
mod error;
pub mod network;

pub use attribute::AttributeValue;
pub use error::{NetworkError, Result};
pub use network::{
    Connection, CoreLocation, Neuron, NeuronGroup, NeuronId, SpikingNetwork,
};
