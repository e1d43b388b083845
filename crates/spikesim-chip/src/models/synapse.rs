//! Built-in synapse models.

use super::{SynapseModel, SynapseResult};
use crate::error::Result;
use spikesim_net::AttributeValue;

const DEFAULT_WEIGHT_BITS: u32 = 8;

/// Current-based synapse: a weight table addressed per connection, stored
/// at a configurable bit resolution (8 bits by default, as on Loihi-class
/// hardware).
#[derive(Debug)]
pub struct CurrentBasedSynapseModel {
    weights: Vec<f64>,
    weight_bits: u32,
}

impl Default for CurrentBasedSynapseModel {
    fn default() -> Self {
        Self {
            weights: Vec::new(),
            weight_bits: DEFAULT_WEIGHT_BITS,
        }
    }
}

impl CurrentBasedSynapseModel {
    /// Smallest representable weight step at the configured resolution.
    fn resolution(&self) -> f64 {
        1.0 / f64::from(1_u32 << (self.weight_bits - 1))
    }

    fn quantize(&self, weight: f64) -> f64 {
        let res = self.resolution();
        (weight / res).round() * res
    }

    fn ensure_address(&mut self, synapse_address: usize) {
        if synapse_address >= self.weights.len() {
            self.weights.resize(synapse_address + 1, 0.0);
        }
    }
}

impl SynapseModel for CurrentBasedSynapseModel {
    fn update(&mut self, synapse_address: usize, read_weight: bool) -> SynapseResult {
        let current = if read_weight {
            self.weights.get(synapse_address).copied().unwrap_or(0.0)
        } else {
            // Passive invocation: no stored current state to decay.
            0.0
        };
        SynapseResult {
            current,
            energy: None,
            latency: None,
        }
    }

    fn set_attribute(
        &mut self,
        synapse_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()> {
        match name {
            "weight" | "w" => {
                self.ensure_address(synapse_address);
                self.weights[synapse_address] = value.as_float(name)?;
                self.weights[synapse_address] = self.quantize(self.weights[synapse_address]);
            }
            "weight_bits" => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    self.weight_bits = value.as_int(name)?.clamp(1, 32) as u32;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
