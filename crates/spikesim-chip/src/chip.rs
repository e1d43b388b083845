//! The simulated chip: mapping, the timestep loop and run accounting.

use crate::error::{Result, SimError};
use crate::hardware::{Core, Tile};
use crate::mapping::{AxonInModel, AxonOutModel, MappedConnection, MappedNeuron, NeuronAddress};
use crate::message::Endpoint;
use crate::timestep::{self, Timestep};
use crate::trace::{RunSummary, TraceFiles};
use serde::Serialize;
use spikesim_arch::Architecture;
use spikesim_arch::NocTopology;
use spikesim_net::{NeuronId, SpikingNetwork};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Default heartbeat interval, in timesteps.
pub const DEFAULT_HEARTBEAT: i64 = 100;

/// Immutable topology lookups, fixed once the chip is built.
#[derive(Debug)]
pub(crate) struct ChipIndex {
    tile_coords: Vec<(usize, usize)>,
    core_ids: Vec<Vec<usize>>,
    locations: Vec<(usize, usize)>,
}

impl ChipIndex {
    pub(crate) fn core_count(&self) -> usize {
        self.locations.len()
    }

    /// `(tile index, core offset)` of a global core id.
    pub(crate) fn location(&self, core: usize) -> (usize, usize) {
        self.locations[core]
    }

    pub(crate) fn endpoint(&self, tile: usize, core_offset: usize) -> Endpoint {
        let (x, y) = self.tile_coords[tile];
        Endpoint {
            tile,
            core: self.core_ids[tile][core_offset],
            core_offset,
            x,
            y,
        }
    }
}

/// Results of one `sim()` call, and of the whole run via
/// [`SpikingChip::get_run_summary`].
#[derive(Debug, Clone, Serialize)]
pub struct RunData {
    /// Energy consumed, in Joules.
    pub energy: f64,
    /// Simulated time, in seconds.
    pub sim_time: f64,
    /// Host wall-clock time spent simulating, in seconds.
    pub wall_time: f64,
    /// Synaptic events processed.
    pub spikes: u64,
    /// Spike packets sent between cores.
    pub packets_sent: u64,
    /// Neuron firings.
    pub neurons_fired: u64,
    /// First timestep covered by this record.
    pub timestep_start: i64,
    /// Timesteps executed.
    pub timesteps_executed: i64,
}

impl RunData {
    fn new(timestep_start: i64, timesteps_executed: i64) -> Self {
        Self {
            energy: 0.0,
            sim_time: 0.0,
            wall_time: 0.0,
            spikes: 0,
            packets_sent: 0,
            neurons_fired: 0,
            timestep_start,
            timesteps_executed,
        }
    }
}

/// A spiking network mapped onto modeled hardware, ready to simulate.
///
/// Construction order is fixed: [`SpikingChip::new`] realises the
/// architecture, [`SpikingChip::load`] maps a network onto it, and
/// [`SpikingChip::sim`] runs timesteps. Any error leaves the chip
/// unusable.
#[derive(Debug)]
pub struct SpikingChip {
    tiles: Vec<Tile>,
    index: ChipIndex,
    noc: NocTopology,
    neuron_lookup: HashMap<NeuronId, NeuronAddress>,
    logged_spikes: Vec<NeuronAddress>,
    logged_potentials: Vec<(NeuronId, NeuronAddress)>,
    out_dir: PathBuf,
    traces: TraceFiles,
    loaded: bool,
    total_energy: f64,
    total_sim_time: f64,
    total_wall_time: f64,
    total_spikes: u64,
    total_packets_sent: u64,
    total_neurons_fired: u64,
    total_timesteps: i64,
}

impl SpikingChip {
    /// Realise an architecture description as simulatable hardware.
    ///
    /// Trace files are created in `out_dir` for each enabled `record_*`
    /// stream (the directory is created if missing).
    ///
    /// # Errors
    ///
    /// Fails on structural architecture errors, unknown unit model names,
    /// or trace-file I/O.
    pub fn new(
        arch: &Architecture,
        out_dir: impl Into<PathBuf>,
        record_spikes: bool,
        record_potentials: bool,
        record_perf: bool,
        record_messages: bool,
    ) -> Result<Self> {
        let arch = arch.clone().validated()?;
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;

        let mut tiles = Vec::with_capacity(arch.tiles.len());
        let mut tile_coords = Vec::with_capacity(arch.tiles.len());
        let mut core_ids = Vec::with_capacity(arch.tiles.len());
        let mut locations = Vec::new();
        for (tile_id, tile_config) in arch.tiles.iter().enumerate() {
            let mut tile = Tile::new(tile_config, tile_id);
            let mut ids = Vec::with_capacity(tile_config.cores.len());
            for (offset, core_config) in tile_config.cores.iter().enumerate() {
                let core_id = locations.len();
                tile.cores
                    .push(Core::new(core_config, core_id, offset, tile_id)?);
                ids.push(core_id);
                locations.push((tile_id, offset));
            }
            tile_coords.push((tile.x, tile.y));
            core_ids.push(ids);
            tiles.push(tile);
        }

        info!(
            arch = %arch.name,
            tiles = tiles.len(),
            cores = locations.len(),
            noc = ?arch.noc,
            "chip realised"
        );
        let traces = TraceFiles::open(
            &out_dir,
            record_spikes,
            record_potentials,
            record_perf,
            record_messages,
        )?;
        Ok(Self {
            tiles,
            index: ChipIndex {
                tile_coords,
                core_ids,
                locations,
            },
            noc: arch.noc,
            neuron_lookup: HashMap::new(),
            logged_spikes: Vec::new(),
            logged_potentials: Vec::new(),
            out_dir,
            traces,
            loaded: false,
            total_energy: 0.0,
            total_sim_time: 0.0,
            total_wall_time: 0.0,
            total_spikes: 0,
            total_packets_sent: 0,
            total_neurons_fired: 0,
            total_timesteps: 0,
        })
    }

    /// Number of cores across all tiles.
    pub fn core_count(&self) -> usize {
        self.index.core_count()
    }

    /// Tiles in id order, for inspection.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Membrane potential of a mapped neuron, if it exists.
    pub fn get_potential(&self, neuron: &NeuronId) -> Option<f64> {
        let address = self.neuron_lookup.get(neuron)?;
        let core = self.core(address.core);
        let n = &core.neurons[address.neuron];
        Some(core.soma[n.soma_hw].model.get_potential(n.mapped_address))
    }

    fn core(&self, core_id: usize) -> &Core {
        let (tile, offset) = self.index.location(core_id);
        &self.tiles[tile].cores[offset]
    }

    fn core_mut(&mut self, core_id: usize) -> &mut Core {
        let (tile, offset) = self.index.location(core_id);
        &mut self.tiles[tile].cores[offset]
    }

    /// Map a network onto the chip: neurons first, then connections, then
    /// the axon tables that tie them together.
    ///
    /// # Errors
    ///
    /// Fails on unmapped neurons, references to missing cores or units, or
    /// attribute type mismatches. The chip must be discarded afterwards.
    pub fn load(&mut self, net: &SpikingNetwork) -> Result<()> {
        self.map_neurons(net)?;
        let outbound = self.map_connections(net)?;
        self.map_axons(&outbound);

        let logged: Vec<NeuronId> = self
            .logged_potentials
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        self.traces.potential_header(&logged)?;
        self.loaded = true;
        info!(
            neurons = self.neuron_lookup.len(),
            connections = outbound.iter().map(Vec::len).sum::<usize>(),
            "network loaded"
        );
        Ok(())
    }

    fn map_neurons(&mut self, net: &SpikingNetwork) -> Result<()> {
        for group in &net.groups {
            for neuron in &group.neurons {
                let id = NeuronId {
                    group: group.name.clone(),
                    id: neuron.id,
                };
                let location = neuron
                    .mapping
                    .ok_or_else(|| SimError::neuron_not_mapped(&id))?;
                let core_id = *self
                    .index
                    .core_ids
                    .get(location.tile)
                    .and_then(|ids| ids.get(location.core_offset))
                    .ok_or(SimError::NoSuchCore {
                        tile: location.tile,
                        core_offset: location.core_offset,
                    })?;
                let core = self.core_mut(core_id);

                let soma_hw = core
                    .soma
                    .iter()
                    .position(|u| u.name == group.soma_hw_name)
                    .ok_or_else(|| {
                        SimError::unit_not_found(&core.name, "soma", &group.soma_hw_name)
                    })?;
                if core.dendrite.is_empty() {
                    return Err(SimError::unit_not_found(&core.name, "dendrite", "any"));
                }
                if core.axon_out_hw.is_empty() {
                    return Err(SimError::unit_not_found(&core.name, "axon_out", "any"));
                }

                let mapped_address = core.neurons.len();
                let mut mapped = MappedNeuron::new(id.clone(), mapped_address, 0, soma_hw, 0);
                mapped.log_spikes = neuron.log_spikes || group.default_log_spikes;
                mapped.log_potential = neuron.log_potential || group.default_log_potential;
                mapped.forced_spikes = neuron.forced_spikes;

                for (name, value) in group.effective_attributes(neuron) {
                    core.soma[soma_hw]
                        .model
                        .set_attribute(mapped_address, &name, &value)?;
                    core.dendrite[0]
                        .model
                        .set_attribute(mapped_address, &name, &value)?;
                }
                if neuron.force_update {
                    core.soma[soma_hw].model.set_attribute(
                        mapped_address,
                        "force_update",
                        &true.into(),
                    )?;
                }
                core.soma[soma_hw].neuron_count += 1;

                let address = NeuronAddress {
                    core: core_id,
                    neuron: mapped_address,
                };
                if mapped.log_spikes {
                    self.logged_spikes.push(address);
                }
                if mapped.log_potential {
                    self.logged_potentials.push((id.clone(), address));
                }
                self.core_mut(core_id).neurons.push(mapped);
                self.neuron_lookup.insert(id, address);
                debug!(core = core_id, address = mapped_address, "mapped neuron");
            }
        }
        Ok(())
    }

    /// Place every connection in its destination core, returning the
    /// outbound handles `(post_core, synapse_address)` per pre-neuron, in
    /// connection order.
    fn map_connections(&mut self, net: &SpikingNetwork) -> Result<Vec<Vec<(usize, usize)>>> {
        let mut outbound: HashMap<NeuronAddress, Vec<(usize, usize)>> = HashMap::new();
        for con in &net.connections {
            let pre = *self
                .neuron_lookup
                .get(&con.pre_neuron)
                .ok_or_else(|| SimError::neuron_not_mapped(&con.pre_neuron))?;
            let post = *self
                .neuron_lookup
                .get(&con.post_neuron)
                .ok_or_else(|| SimError::neuron_not_mapped(&con.post_neuron))?;

            let core = self.core_mut(post.core);
            let synapse_hw = core
                .synapse
                .iter()
                .position(|u| u.name == con.synapse_hw_name)
                .ok_or_else(|| {
                    SimError::unit_not_found(&core.name, "synapse", &con.synapse_hw_name)
                })?;
            let synapse_address = core.connections_in.len();
            core.synapse[synapse_hw].model.set_attribute(
                synapse_address,
                "weight",
                &con.weight.into(),
            )?;
            core.connections_in.push(MappedConnection {
                pre_neuron: pre,
                post_neuron: post,
                synapse_hw,
                synapse_address,
                dendrite_params: con.dendrite_params.clone(),
                last_updated: 0,
            });
            outbound.entry(pre).or_default().push((post.core, synapse_address));
        }

        // Flatten to per-core, per-neuron order for the axon pass.
        let mut per_neuron = Vec::new();
        for core_id in 0..self.core_count() {
            for neuron in 0..self.core(core_id).neurons.len() {
                per_neuron.push(
                    outbound
                        .remove(&NeuronAddress {
                            core: core_id,
                            neuron,
                        })
                        .unwrap_or_default(),
                );
            }
        }
        Ok(per_neuron)
    }

    /// Build the axon tables: every pre-neuron gets one axon-out entry per
    /// distinct destination core, pointing at a fresh inbound axon at the
    /// destination that lists all synapse addresses between the two.
    fn map_axons(&mut self, outbound: &[Vec<(usize, usize)>]) {
        let mut flat = 0;
        for core_id in 0..self.core_count() {
            for neuron in 0..self.core(core_id).neurons.len() {
                let handles = &outbound[flat];
                flat += 1;
                let mut axon_by_dest: HashMap<usize, usize> = HashMap::new();
                for &(dest_core, synapse_address) in handles {
                    let axon_out_address = if let Some(existing) =
                        axon_by_dest.get(&dest_core).copied()
                    {
                        existing
                    } else {
                        let dest_axon_id = self.core(dest_core).axons_in.len();
                        self.core_mut(dest_core)
                            .axons_in
                            .push(AxonInModel::default());

                        let (dest_tile, dest_offset) = self.index.location(dest_core);
                        let pre_core = self.core_mut(core_id);
                        let axon_out_address = pre_core.axons_out.len();
                        pre_core.axons_out.push(AxonOutModel {
                            dest_tile_id: dest_tile,
                            dest_core_offset: dest_offset,
                            dest_axon_id,
                        });
                        pre_core.neurons[neuron]
                            .axon_out_addresses
                            .push(axon_out_address);
                        axon_by_dest.insert(dest_core, axon_out_address);
                        axon_out_address
                    };
                    let dest_axon_id =
                        self.core(core_id).axons_out[axon_out_address].dest_axon_id;
                    self.core_mut(dest_core).axons_in[dest_axon_id]
                        .synapse_addresses
                        .push(synapse_address);
                }
            }
        }
    }

    /// Simulate `timesteps` further timesteps, logging an `info` heartbeat
    /// every `heartbeat` steps ([`DEFAULT_HEARTBEAT`] if zero or negative).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotLoaded`] before `load()`, or an I/O error
    /// from the trace writers.
    pub fn sim(&mut self, timesteps: i64, heartbeat: i64) -> Result<RunData> {
        if !self.loaded {
            return Err(SimError::NotLoaded);
        }
        let heartbeat = if heartbeat > 0 {
            heartbeat
        } else {
            DEFAULT_HEARTBEAT
        };
        let wall_start = Instant::now();
        let timestep_start = self.total_timesteps + 1;
        let mut run = RunData::new(timestep_start, timesteps);

        for step in 0..timesteps {
            let t = timestep_start + step;
            let (ts, scheduled) = timestep::run(&mut self.tiles, &self.index, &self.noc, t);

            self.record_traces(&ts, &scheduled)?;

            run.energy += ts.energy;
            run.sim_time += ts.sim_time;
            run.spikes += ts.spike_count;
            run.packets_sent += ts.packets_sent;
            run.neurons_fired += ts.neurons_fired;
            self.total_energy += ts.energy;
            self.total_sim_time += ts.sim_time;
            self.total_spikes += ts.spike_count;
            self.total_packets_sent += ts.packets_sent;
            self.total_neurons_fired += ts.neurons_fired;
            self.total_timesteps = t;

            if t % heartbeat == 0 {
                info!(
                    timestep = t,
                    fired = ts.neurons_fired,
                    packets = ts.packets_sent,
                    sim_time = self.total_sim_time,
                    "heartbeat"
                );
            }
        }

        run.wall_time = wall_start.elapsed().as_secs_f64();
        self.total_wall_time += run.wall_time;
        self.traces.flush()?;
        crate::trace::write_run_summary(&self.out_dir, &self.summary())?;
        Ok(run)
    }

    fn record_traces(&mut self, ts: &Timestep, scheduled: &[crate::Message]) -> Result<()> {
        let Self {
            tiles,
            index,
            traces,
            logged_spikes,
            logged_potentials,
            ..
        } = self;
        for address in logged_spikes.iter() {
            let (tile, offset) = index.location(address.core);
            let n = &tiles[tile].cores[offset].neurons[address.neuron];
            if n.status == crate::NeuronStatus::Fired {
                traces.record_spike(&n.id, ts.timestep)?;
            }
        }
        if traces.potentials_enabled() {
            let potentials: Vec<f64> = logged_potentials
                .iter()
                .map(|(_, address)| {
                    let (tile, offset) = index.location(address.core);
                    let core = &tiles[tile].cores[offset];
                    let n = &core.neurons[address.neuron];
                    core.soma[n.soma_hw].model.get_potential(n.mapped_address)
                })
                .collect();
            traces.record_potentials(&potentials)?;
        }
        traces.record_perf(ts)?;
        traces.record_messages(scheduled)?;
        Ok(())
    }

    /// Mean power over the simulated run, in Watts.
    pub fn get_power(&self) -> f64 {
        if self.total_sim_time > 0.0 {
            self.total_energy / self.total_sim_time
        } else {
            0.0
        }
    }

    /// Cumulative results since construction or the last `reset()`.
    pub fn get_run_summary(&self) -> RunData {
        RunData {
            energy: self.total_energy,
            sim_time: self.total_sim_time,
            wall_time: self.total_wall_time,
            spikes: self.total_spikes,
            packets_sent: self.total_packets_sent,
            neurons_fired: self.total_neurons_fired,
            timestep_start: 1,
            timesteps_executed: self.total_timesteps,
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            energy: self.total_energy,
            sim_time: self.total_sim_time,
            wall_time: self.total_wall_time,
            spikes: self.total_spikes,
            packets_sent: self.total_packets_sent,
            neurons_fired: self.total_neurons_fired,
            timesteps: self.total_timesteps,
        }
    }

    /// Rewind the chip to timestep zero: clear model dynamics, transient
    /// neuron state and run totals. Mapping and weights survive.
    pub fn reset(&mut self) {
        for tile in &mut self.tiles {
            for core in &mut tile.cores {
                for unit in &mut core.dendrite {
                    unit.model.reset();
                }
                for unit in &mut core.soma {
                    unit.model.reset();
                }
                for con in &mut core.connections_in {
                    con.last_updated = 0;
                }
                for n in &mut core.neurons {
                    n.dendrite_last_updated = 0;
                    n.soma_last_updated = 0;
                    n.spike_count = 0;
                    n.status = crate::NeuronStatus::Idle;
                    n.dendrite_input_synapses.clear();
                    n.soma_input_charge = 0.0;
                    n.axon_out_input_spike = false;
                }
                core.next_message_generation_delay = 0.0;
            }
        }
        timestep::reset_measurements(&mut self.tiles);
        self.total_energy = 0.0;
        self.total_sim_time = 0.0;
        self.total_wall_time = 0.0;
        self.total_spikes = 0;
        self.total_packets_sent = 0;
        self.total_neurons_fired = 0;
        self.total_timesteps = 0;
    }
}
