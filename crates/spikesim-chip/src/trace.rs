//! Trace streams and the end-of-run summary.
//!
//! Four optional CSV streams (spikes, potentials, per-timestep performance,
//! per-message schedule) plus `run_summary.yaml`, all written under the
//! chip's output directory.

use crate::error::Result;
use crate::message::Message;
use crate::timestep::Timestep;
use serde::Serialize;
use spikesim_net::NeuronId;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// End-of-run totals serialized to `run_summary.yaml`.
#[derive(Debug, Serialize)]
pub(crate) struct RunSummary {
    pub energy: f64,
    pub sim_time: f64,
    pub wall_time: f64,
    pub spikes: u64,
    pub packets_sent: u64,
    pub neurons_fired: u64,
    pub timesteps: i64,
}

/// The set of enabled trace writers.
#[derive(Debug)]
pub(crate) struct TraceFiles {
    spike: Option<BufWriter<File>>,
    potential: Option<BufWriter<File>>,
    perf: Option<BufWriter<File>>,
    message: Option<BufWriter<File>>,
}

fn open(out_dir: &Path, name: &str) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(out_dir.join(name))?))
}

impl TraceFiles {
    /// Create the enabled streams and write the headers that do not depend
    /// on the mapped network.
    pub fn open(
        out_dir: &Path,
        record_spikes: bool,
        record_potentials: bool,
        record_perf: bool,
        record_messages: bool,
    ) -> Result<Self> {
        let mut spike = record_spikes.then(|| open(out_dir, "spikes.csv")).transpose()?;
        let potential = record_potentials
            .then(|| open(out_dir, "potentials.csv"))
            .transpose()?;
        let mut perf = record_perf.then(|| open(out_dir, "perf.csv")).transpose()?;
        let mut message = record_messages
            .then(|| open(out_dir, "messages.csv"))
            .transpose()?;

        if let Some(f) = spike.as_mut() {
            writeln!(f, "gid.nid,timestep")?;
        }
        if let Some(f) = perf.as_mut() {
            writeln!(f, "timestep,fired,packets,hops,total_energy")?;
        }
        if let Some(f) = message.as_mut() {
            writeln!(
                f,
                "timestep,src_neuron,src_hw,dest_hw,hops,spikes,generation_delay,\
                 network_delay,processing_latency,blocking_latency,sent_timestamp,\
                 processed_timestamp"
            )?;
        }
        Ok(Self {
            spike,
            potential,
            perf,
            message,
        })
    }

    /// Potential header: one column per logged neuron, in trace order.
    pub fn potential_header(&mut self, logged: &[NeuronId]) -> Result<()> {
        if let Some(f) = self.potential.as_mut() {
            for id in logged {
                write!(f, "{id},")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    pub fn potentials_enabled(&self) -> bool {
        self.potential.is_some()
    }

    pub fn record_spike(&mut self, id: &NeuronId, timestep: i64) -> Result<()> {
        if let Some(f) = self.spike.as_mut() {
            writeln!(f, "{id},{timestep}")?;
        }
        Ok(())
    }

    /// One row of potentials in header order.
    pub fn record_potentials(&mut self, potentials: &[f64]) -> Result<()> {
        if let Some(f) = self.potential.as_mut() {
            for v in potentials {
                write!(f, "{v},")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    pub fn record_perf(&mut self, ts: &Timestep) -> Result<()> {
        if let Some(f) = self.perf.as_mut() {
            writeln!(
                f,
                "{},{},{},{},{:e}",
                ts.timestep, ts.neurons_fired, ts.packets_sent, ts.total_hops, ts.energy
            )?;
        }
        Ok(())
    }

    /// One row per real message, in scheduled order.
    pub fn record_messages(&mut self, scheduled: &[Message]) -> Result<()> {
        if let Some(f) = self.message.as_mut() {
            for m in scheduled.iter().filter(|m| !m.placeholder) {
                writeln!(
                    f,
                    "{},{},{}.{},{}.{},{},{},{:e},{:e},{:e},{:e},{:e},{:e}",
                    m.timestep,
                    m.src_neuron,
                    m.src_tile_id,
                    m.src_core_id,
                    m.dest_tile_id,
                    m.dest_core_id,
                    m.hops,
                    m.spikes,
                    m.generation_delay,
                    m.network_delay,
                    m.receive_delay,
                    m.blocked_delay,
                    m.sent_timestamp,
                    m.processed_timestamp
                )?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for f in [
            self.spike.as_mut(),
            self.potential.as_mut(),
            self.perf.as_mut(),
            self.message.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            f.flush()?;
        }
        Ok(())
    }
}

/// Write the cumulative run summary as YAML.
pub(crate) fn write_run_summary(out_dir: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(out_dir.join("run_summary.yaml"))?;
    serde_yaml::to_writer(BufWriter::new(file), summary)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(())
}
