//! Built-in dendrite models.

use super::{DendriteModel, DendriteResult, SynapticInput};
use crate::error::Result;
use spikesim_net::AttributeValue;

fn result(current: f64) -> DendriteResult {
    DendriteResult {
        current,
        energy: None,
        latency: None,
    }
}

/// Charge accumulator: sums synaptic currents per neuron and presents the
/// running charge to the soma. Passive updates decay the store by
/// `leak_decay` first (0.0, the default, clears it once the charge has been
/// handed over; 1.0 holds charge indefinitely).
#[derive(Debug, Default)]
pub struct AccumulatorModel {
    charges: Vec<f64>,
    leak_decay: f64,
}

impl AccumulatorModel {
    fn ensure_address(&mut self, neuron_address: usize) {
        if neuron_address >= self.charges.len() {
            self.charges.resize(neuron_address + 1, 0.0);
        }
    }
}

impl DendriteModel for AccumulatorModel {
    fn update(
        &mut self,
        neuron_address: usize,
        synapse_in: Option<SynapticInput<'_>>,
    ) -> DendriteResult {
        self.ensure_address(neuron_address);
        match synapse_in {
            Some(syn) => {
                self.charges[neuron_address] += syn.current;
                result(self.charges[neuron_address])
            }
            None => {
                self.charges[neuron_address] *= self.leak_decay;
                result(self.charges[neuron_address])
            }
        }
    }

    fn set_attribute(
        &mut self,
        neuron_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()> {
        if name == "dendrite_leak_decay" || name == "leak_decay" {
            self.ensure_address(neuron_address);
            self.leak_decay = value.as_float(name)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.charges.fill(0.0);
    }
}

/// Per-neuron state of the multi-tap cable.
#[derive(Debug, Clone, Default)]
struct TapCompartment {
    voltages: Vec<f64>,
    time_constants: Vec<f64>,
    space_constants: Vec<f64>,
}

/// 1-D multi-tap dendritic cable. Synaptic input lands on the tap named by
/// the connection's `tap` parameter; each passive update decays every tap by
/// its time constant and diffuses charge towards the soma-proximal tap
/// (index 0), whose voltage is what the soma sees.
#[derive(Debug, Default)]
pub struct MultiTapModel {
    compartments: Vec<TapCompartment>,
}

impl MultiTapModel {
    fn ensure_address(&mut self, neuron_address: usize) {
        if neuron_address >= self.compartments.len() {
            self.compartments
                .resize(neuron_address + 1, TapCompartment::default());
        }
        let c = &mut self.compartments[neuron_address];
        if c.voltages.is_empty() {
            c.voltages = vec![0.0];
            c.time_constants = vec![0.0];
            c.space_constants = Vec::new();
        }
    }

    fn step(c: &mut TapCompartment) {
        let taps = c.voltages.len();
        let mut next = vec![0.0; taps];
        for (i, next_v) in next.iter_mut().enumerate() {
            *next_v = c.voltages[i] * c.time_constants[i];
        }
        for i in 1..taps {
            // Diffusion towards the proximal tap.
            let coupling = c.space_constants.get(i - 1).copied().unwrap_or(0.0);
            let transfer = c.voltages[i] * coupling;
            next[i] -= transfer;
            next[i - 1] += transfer;
        }
        c.voltages = next;
    }
}

impl DendriteModel for MultiTapModel {
    fn update(
        &mut self,
        neuron_address: usize,
        synapse_in: Option<SynapticInput<'_>>,
    ) -> DendriteResult {
        self.ensure_address(neuron_address);
        let c = &mut self.compartments[neuron_address];
        match synapse_in {
            Some(syn) => {
                #[allow(clippy::cast_sign_loss)]
                let tap = syn
                    .params
                    .get("tap")
                    .and_then(|v| v.as_int("tap").ok())
                    .map_or(0, |t| t.max(0) as usize)
                    .min(c.voltages.len() - 1);
                c.voltages[tap] += syn.current;
                result(c.voltages[0])
            }
            None => {
                Self::step(c);
                result(c.voltages[0])
            }
        }
    }

    fn set_attribute(
        &mut self,
        neuron_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()> {
        self.ensure_address(neuron_address);
        let c = &mut self.compartments[neuron_address];
        match name {
            "taps" => {
                #[allow(clippy::cast_sign_loss)]
                let taps = value.as_int(name)?.max(1) as usize;
                c.voltages = vec![0.0; taps];
                c.time_constants.resize(taps, 0.0);
            }
            "time_constants" => {
                c.time_constants = value.as_float_list(name)?;
                c.voltages.resize(c.time_constants.len().max(1), 0.0);
            }
            "space_constants" => {
                c.space_constants = value.as_float_list(name)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        for c in &mut self.compartments {
            c.voltages.fill(0.0);
        }
    }
}
