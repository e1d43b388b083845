//! Built-in soma models.

use super::{NeuronStatus, ResetMode, SomaModel, SomaResult};
use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spikesim_net::AttributeValue;

fn result(status: NeuronStatus) -> SomaResult {
    SomaResult {
        status,
        energy: None,
        latency: None,
    }
}

/// One LIF compartment.
#[derive(Debug, Clone)]
struct LifCompartment {
    potential: f64,
    leak_decay: f64,
    bias: f64,
    threshold: f64,
    reverse_threshold: f64,
    reset: f64,
    reverse_reset: f64,
    reset_mode: ResetMode,
    reverse_reset_mode: ResetMode,
    force_update: bool,
}

impl Default for LifCompartment {
    fn default() -> Self {
        Self {
            potential: 0.0,
            leak_decay: 1.0,
            bias: 0.0,
            threshold: 0.0,
            reverse_threshold: f64::NEG_INFINITY,
            reset: 0.0,
            reverse_reset: 0.0,
            reset_mode: ResetMode::Hard,
            reverse_reset_mode: ResetMode::None,
            force_update: false,
        }
    }
}

/// Leaky-integrate-and-fire soma, Loihi-flavoured: multiplicative leak
/// decay, additive bias, positive and reverse thresholds with configurable
/// reset modes.
#[derive(Debug, Default)]
pub struct LeakyIntegrateFireModel {
    compartments: Vec<LifCompartment>,
}

impl LeakyIntegrateFireModel {
    fn ensure_address(&mut self, neuron_address: usize) {
        if neuron_address >= self.compartments.len() {
            self.compartments
                .resize(neuron_address + 1, LifCompartment::default());
        }
    }
}

impl SomaModel for LeakyIntegrateFireModel {
    fn update(&mut self, neuron_address: usize, current_in: Option<f64>) -> SomaResult {
        self.ensure_address(neuron_address);
        let c = &mut self.compartments[neuron_address];

        c.potential *= c.leak_decay;
        c.potential += current_in.unwrap_or(0.0) + c.bias;

        // A biased neuron must exceed its threshold; an unbiased one fires
        // at it.
        let fired = if c.bias == 0.0 {
            c.potential >= c.threshold
        } else {
            c.potential > c.threshold
        };
        if fired {
            match c.reset_mode {
                ResetMode::Hard => c.potential = c.reset,
                ResetMode::Soft => c.potential -= c.threshold,
                ResetMode::Saturate => c.potential = c.threshold,
                ResetMode::None => {}
            }
            return result(NeuronStatus::Fired);
        }

        if c.potential < c.reverse_threshold {
            match c.reverse_reset_mode {
                ResetMode::Hard => c.potential = c.reverse_reset,
                ResetMode::Soft => c.potential -= c.reverse_threshold,
                ResetMode::Saturate => c.potential = c.reverse_threshold,
                ResetMode::None => {}
            }
        }

        let active = current_in.is_some()
            || c.bias.abs() > 0.0
            || c.potential.abs() > 0.0
            || c.force_update;
        result(if active {
            NeuronStatus::Updated
        } else {
            NeuronStatus::Idle
        })
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
            "leak_decay" => c.leak_decay = value.as_float(name)?,
            "bias" => c.bias = value.as_float(name)?,
            "threshold" => c.threshold = value.as_float(name)?,
            "reverse_threshold" => c.reverse_threshold = value.as_float(name)?,
            "reset" => c.reset = value.as_float(name)?,
            "reverse_reset" => c.reverse_reset = value.as_float(name)?,
            "reset_mode" => c.reset_mode = ResetMode::parse(name, value.as_str(name)?)?,
            "reverse_reset_mode" => {
                c.reverse_reset_mode = ResetMode::parse(name, value.as_str(name)?)?;
            }
            "force_update" => c.force_update = value.as_bool(name)?,
            _ => {}
        }
        Ok(())
    }

    fn get_potential(&self, neuron_address: usize) -> f64 {
        self.compartments
            .get(neuron_address)
            .map_or(0.0, |c| c.potential)
    }

    fn reset(&mut self) {
        for c in &mut self.compartments {
            c.potential = 0.0;
        }
    }
}

/// One TrueNorth-style neuron.
#[derive(Debug, Clone)]
struct TrueNorthNeuron {
    potential: f64,
    leak: f64,
    leak_towards_zero: bool,
    bias: f64,
    threshold: f64,
    reverse_threshold: f64,
    reset: f64,
    reverse_reset: f64,
    reset_mode: ResetMode,
    reverse_reset_mode: ResetMode,
    random_range_mask: u32,
    force_update: bool,
}

impl Default for TrueNorthNeuron {
    fn default() -> Self {
        Self {
            potential: 0.0,
            leak: 0.0,
            leak_towards_zero: true,
            bias: 0.0,
            threshold: 0.0,
            reverse_threshold: f64::NEG_INFINITY,
            reset: 0.0,
            reverse_reset: 0.0,
            reset_mode: ResetMode::Hard,
            reverse_reset_mode: ResetMode::None,
            random_range_mask: 0,
            force_update: false,
        }
    }
}

/// TrueNorth-style soma: linear leak (optionally convergent towards zero)
/// and an optional stochastic threshold drawn from a masked random range.
#[derive(Debug)]
pub struct TrueNorthModel {
    neurons: Vec<TrueNorthNeuron>,
    rng: StdRng,
}

impl Default for TrueNorthModel {
    fn default() -> Self {
        Self {
            neurons: Vec::new(),
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl TrueNorthModel {
    fn ensure_address(&mut self, neuron_address: usize) {
        if neuron_address >= self.neurons.len() {
            self.neurons
                .resize(neuron_address + 1, TrueNorthNeuron::default());
        }
    }
}

impl SomaModel for TrueNorthModel {
    fn update(&mut self, neuron_address: usize, current_in: Option<f64>) -> SomaResult {
        self.ensure_address(neuron_address);
        let n = &mut self.neurons[neuron_address];

        if n.leak_towards_zero {
            if n.potential > 0.0 {
                n.potential -= n.leak;
            } else if n.potential < 0.0 {
                n.potential += n.leak;
            }
        } else {
            n.potential += n.leak;
        }
        n.potential += current_in.unwrap_or(0.0) + n.bias;

        let mut v = n.potential;
        if n.random_range_mask != 0 {
            let r = self.rng.gen::<u32>() & n.random_range_mask;
            v += f64::from(r);
        }

        if v >= n.threshold {
            match n.reset_mode {
                ResetMode::Hard => n.potential = n.reset,
                ResetMode::Soft => n.potential -= n.threshold,
                ResetMode::Saturate => n.potential = n.threshold,
                ResetMode::None => {}
            }
            return result(NeuronStatus::Fired);
        }
        if v <= n.reverse_threshold {
            match n.reverse_reset_mode {
                ResetMode::Hard => n.potential = n.reverse_reset,
                ResetMode::Soft => n.potential += n.reverse_threshold,
                ResetMode::Saturate => n.potential = n.reverse_threshold,
                ResetMode::None => {}
            }
        }

        let active = current_in.is_some()
            || n.bias.abs() > 0.0
            || n.potential.abs() > 0.0
            || n.force_update;
        result(if active {
            NeuronStatus::Updated
        } else {
            NeuronStatus::Idle
        })
    }

    fn set_attribute(
        &mut self,
        neuron_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()> {
        if name == "seed" {
            #[allow(clippy::cast_sign_loss)]
            {
                self.rng = StdRng::seed_from_u64(value.as_int(name)? as u64);
            }
            return Ok(());
        }
        self.ensure_address(neuron_address);
        let n = &mut self.neurons[neuron_address];
        match name {
            "leak" => n.leak = value.as_float(name)?,
            "leak_towards_zero" => n.leak_towards_zero = value.as_bool(name)?,
            "bias" => n.bias = value.as_float(name)?,
            "threshold" => n.threshold = value.as_float(name)?,
            "reverse_threshold" => n.reverse_threshold = value.as_float(name)?,
            "reset" => n.reset = value.as_float(name)?,
            "reverse_reset" => n.reverse_reset = value.as_float(name)?,
            "reset_mode" => n.reset_mode = ResetMode::parse(name, value.as_str(name)?)?,
            "reverse_reset_mode" => {
                n.reverse_reset_mode = ResetMode::parse(name, value.as_str(name)?)?;
            }
            "random_range_mask" => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    n.random_range_mask = value.as_int(name)? as u32;
                }
            }
            "force_update" => n.force_update = value.as_bool(name)?,
            _ => {}
        }
        Ok(())
    }

    fn get_potential(&self, neuron_address: usize) -> f64 {
        self.neurons.get(neuron_address).map_or(0.0, |n| n.potential)
    }

    fn reset(&mut self) {
        for n in &mut self.neurons {
            n.potential = 0.0;
        }
    }
}

/// Stimulus source state for one input neuron.
#[derive(Debug, Clone, Default)]
struct InputSource {
    spikes: Vec<bool>,
    cursor: usize,
    poisson_probability: f64,
}

/// Stimulus source soma: replays an explicit spike train, then falls back
/// to Poisson firing at the configured probability. Ignores synaptic input.
#[derive(Debug)]
pub struct InputModel {
    sources: Vec<InputSource>,
    rng: StdRng,
}

impl Default for InputModel {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl InputModel {
    fn ensure_address(&mut self, neuron_address: usize) {
        if neuron_address >= self.sources.len() {
            self.sources
                .resize(neuron_address + 1, InputSource::default());
        }
    }
}

impl SomaModel for InputModel {
    fn update(&mut self, neuron_address: usize, _current_in: Option<f64>) -> SomaResult {
        self.ensure_address(neuron_address);
        let src = &mut self.sources[neuron_address];
        let fired = if src.cursor < src.spikes.len() {
            let f = src.spikes[src.cursor];
            src.cursor += 1;
            f
        } else if src.poisson_probability > 0.0 {
            self.rng.gen::<f64>() < src.poisson_probability
        } else {
            false
        };
        result(if fired {
            NeuronStatus::Fired
        } else {
            NeuronStatus::Idle
        })
    }

    fn set_attribute(
        &mut self,
        neuron_address: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<()> {
        if name == "seed" {
            #[allow(clippy::cast_sign_loss)]
            {
                self.rng = StdRng::seed_from_u64(value.as_int(name)? as u64);
            }
            return Ok(());
        }
        self.ensure_address(neuron_address);
        let src = &mut self.sources[neuron_address];
        match name {
            "spikes" => {
                src.spikes = value.as_bool_list(name)?;
                src.cursor = 0;
            }
            "poisson" | "rate" => src.poisson_probability = value.as_float(name)?,
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        for src in &mut self.sources {
            src.cursor = 0;
        }
    }
}
