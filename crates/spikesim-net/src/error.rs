//! Error types for network-model operations.

use thiserror::Error;

/// Result type alias for network-model operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while assembling or querying a spiking network.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Referenced neuron group does not exist.
    #[error("unknown neuron group: {group}")]
    UnknownGroup {
        /// Group name that was looked up.
        group: String,
    },

    /// Referenced neuron does not exist within its group.
    #[error("unknown neuron: {group}.{id}")]
    UnknownNeuron {
        /// Group name.
        group: String,
        /// Neuron id within the group.
        id: usize,
    },

    /// Two groups share a name.
    #[error("duplicate neuron group: {group}")]
    DuplicateGroup {
        /// Group name.
        group: String,
    },

    /// An attribute held a value of the wrong type.
    #[error("attribute {name}: expected {expected}, got {got}")]
    AttributeType {
        /// Attribute name.
        name: String,
        /// Expected type description.
        expected: &'static str,
        /// Actual type description.
        got: &'static str,
    },
}

impl NetworkError {
    /// Create an unknown-group error.
    pub fn unknown_group(group: impl Into<String>) -> Self {
        Self::UnknownGroup {
            group: group.into(),
        }
    }

    /// Create an attribute type-mismatch error.
    pub fn attribute_type(
        name: impl Into<String>,
        expected: &'static str,
        got: &'static str,
    ) -> Self {
        Self::AttributeType {
            name: name.into(),
            expected,
            got,
        }
    }
}
