//! Reference architectures and workloads.
//!
//! Prebuilt chip templates and small networks used by the CLI, the bench
//! binaries and the test suite. The file parsers live outside this
//! workspace; everything here is constructed programmatically.
//!
//! | Helper | Produces |
//! |--------|----------|
//! | [`grid_architecture`] | uniform `width × height` mesh, N cores per tile |
//! | [`self_loop_network`] | one biased neuron spiking to itself every timestep |
//! | [`feed_forward_network`] | biased input layer fully connected to an output layer |
//! | [`map_round_robin`] | spread a network's neurons across all cores |

use crate::error::Result;
use spikesim_arch::{
    Architecture, AxonInConfiguration, AxonOutConfiguration, BufferPosition, CoreConfiguration,
    CorePipelineConfiguration, DendriteConfiguration, NocTopology, SomaConfiguration,
    SomaEnergyMetrics, SomaLatencyMetrics, SynapseConfiguration, TileConfiguration,
};
use spikesim_net::{CoreLocation, NeuronId, SpikingNetwork};

/// Per-event costs applied uniformly across a generated architecture.
///
/// Defaults are digital-neuromorphic scale: picojoule events, nanosecond
/// latencies.
#[derive(Debug, Clone, Copy)]
pub struct UnitCosts {
    /// Axon-in energy per message, Joules.
    pub energy_axon_in: f64,
    /// Axon-in latency per message, seconds.
    pub latency_axon_in: f64,
    /// Synapse energy per spike event.
    pub energy_synapse: f64,
    /// Synapse latency per spike event.
    pub latency_synapse: f64,
    /// Dendrite energy per update.
    pub energy_dendrite: f64,
    /// Dendrite latency per update.
    pub latency_dendrite: f64,
    /// Soma energy per state read.
    pub energy_soma_access: f64,
    /// Soma latency per state read.
    pub latency_soma_access: f64,
    /// Soma energy per state change.
    pub energy_soma_update: f64,
    /// Soma latency per state change.
    pub latency_soma_update: f64,
    /// Soma energy per spike out.
    pub energy_soma_spike: f64,
    /// Soma latency per spike out.
    pub latency_soma_spike: f64,
    /// Axon-out energy per packet.
    pub energy_axon_out: f64,
    /// Axon-out latency per packet.
    pub latency_axon_out: f64,
    /// NoC energy per hop, all directions.
    pub energy_hop: f64,
    /// NoC latency per hop, all directions.
    pub latency_hop: f64,
}

impl Default for UnitCosts {
    fn default() -> Self {
        Self {
            energy_axon_in: 0.2e-12,
            latency_axon_in: 1.0e-9,
            energy_synapse: 0.5e-12,
            latency_synapse: 2.0e-9,
            energy_dendrite: 0.0,
            latency_dendrite: 0.0,
            energy_soma_access: 0.1e-12,
            latency_soma_access: 1.0e-9,
            energy_soma_update: 0.8e-12,
            latency_soma_update: 2.0e-9,
            energy_soma_spike: 1.5e-12,
            latency_soma_spike: 3.0e-9,
            energy_axon_out: 0.3e-12,
            latency_axon_out: 2.0e-9,
            energy_hop: 2.0e-12,
            latency_hop: 4.0e-9,
        }
    }
}

/// Parameters of a generated mesh architecture.
#[derive(Debug, Clone, Copy)]
pub struct ChipTemplate {
    /// Mesh width, in tiles.
    pub width: usize,
    /// Mesh height, in tiles.
    pub height: usize,
    /// Cores per tile.
    pub cores_per_tile: usize,
    /// Router buffer depth, in messages.
    pub noc_buffer_size: usize,
    /// Pipeline buffer placement, applied to every core.
    pub buffer_position: BufferPosition,
    /// Uniform unit costs.
    pub costs: UnitCosts,
}

impl Default for ChipTemplate {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            cores_per_tile: 4,
            noc_buffer_size: 4,
            buffer_position: BufferPosition::BeforeSoma,
            costs: UnitCosts::default(),
        }
    }
}

fn core_configuration(template: &ChipTemplate, name: String) -> CoreConfiguration {
    let costs = &template.costs;
    CoreConfiguration {
        name,
        pipeline: CorePipelineConfiguration {
            buffer_position: template.buffer_position,
        },
        axon_in: vec![AxonInConfiguration {
            name: "axon_in".into(),
            energy_message: costs.energy_axon_in,
            latency_message: costs.latency_axon_in,
        }],
        synapses: vec![SynapseConfiguration {
            name: "synapse".into(),
            model: "current_based".into(),
            energy_process_spike: costs.energy_synapse,
            latency_process_spike: costs.latency_synapse,
        }],
        dendrites: vec![DendriteConfiguration {
            name: "dendrite".into(),
            model: "accumulator".into(),
            energy_update: costs.energy_dendrite,
            latency_update: costs.latency_dendrite,
        }],
        somas: vec![SomaConfiguration {
            name: "soma".into(),
            model: "leaky_integrate_fire".into(),
            energy_metrics: SomaEnergyMetrics {
                energy_access_neuron: costs.energy_soma_access,
                energy_update_neuron: costs.energy_soma_update,
                energy_spike_out: costs.energy_soma_spike,
            },
            latency_metrics: SomaLatencyMetrics {
                latency_access_neuron: costs.latency_soma_access,
                latency_update_neuron: costs.latency_soma_update,
                latency_spike_out: costs.latency_soma_spike,
            },
        }],
        axon_out: vec![AxonOutConfiguration {
            name: "axon_out".into(),
            energy_access: costs.energy_axon_out,
            latency_access: costs.latency_axon_out,
        }],
    }
}

/// Build an architecture from a template.
///
/// # Errors
///
/// Propagates structural validation errors.
pub fn architecture(template: &ChipTemplate) -> Result<Architecture> {
    let mut tiles = Vec::with_capacity(template.width * template.height);
    for tile_id in 0..template.width * template.height {
        let x = tile_id % template.width;
        let y = tile_id / template.width;
        let mut tile = TileConfiguration::uniform(
            format!("tile.{tile_id}"),
            x,
            y,
            template.costs.energy_hop,
            template.costs.latency_hop,
        );
        for core in 0..template.cores_per_tile {
            tile.cores
                .push(core_configuration(template, format!("core.{tile_id}.{core}")));
        }
        tiles.push(tile);
    }
    Ok(Architecture {
        name: format!(
            "mesh-{}x{}x{}",
            template.width, template.height, template.cores_per_tile
        ),
        noc: NocTopology {
            width: template.width,
            height: template.height,
            buffer_size: template.noc_buffer_size,
            max_cores_per_tile: template.cores_per_tile,
        },
        tiles,
    }
    .validated()?)
}

/// Uniform mesh with default costs and buffer placement.
///
/// # Errors
///
/// Propagates structural validation errors.
pub fn grid_architecture(
    width: usize,
    height: usize,
    cores_per_tile: usize,
    costs: &UnitCosts,
) -> Result<Architecture> {
    architecture(&ChipTemplate {
        width,
        height,
        cores_per_tile,
        costs: *costs,
        ..ChipTemplate::default()
    })
}

/// One biased neuron connected to itself, mapped to tile 0 core 0. Fires
/// every timestep.
///
/// # Errors
///
/// Never fails in practice; propagates network-construction errors.
pub fn self_loop_network() -> Result<SpikingNetwork> {
    let mut net = SpikingNetwork::new();
    let group = net.create_group("loop", 1)?;
    group.default_attributes.insert("bias".into(), 1.0.into());
    group
        .default_attributes
        .insert("threshold".into(), 0.5.into());
    let nid = NeuronId {
        group: "loop".into(),
        id: 0,
    };
    net.connect(nid.clone(), nid.clone(), 1.0)?;
    net.map_neuron(
        &nid,
        CoreLocation {
            tile: 0,
            core_offset: 0,
        },
    )?;
    Ok(net)
}

/// A biased input layer fully connected to an output layer. Input neurons
/// fire every timestep; output neurons fire whenever at least one weighted
/// spike arrives. Everything starts mapped to tile 0 core 0; use
/// [`map_round_robin`] to spread the load.
///
/// # Errors
///
/// Propagates network-construction errors.
pub fn feed_forward_network(inputs: usize, outputs: usize, weight: f64) -> Result<SpikingNetwork> {
    let mut net = SpikingNetwork::new();
    let group = net.create_group("in", inputs)?;
    group.default_attributes.insert("bias".into(), 1.0.into());
    group
        .default_attributes
        .insert("threshold".into(), 0.5.into());
    let group = net.create_group("out", outputs)?;
    group
        .default_attributes
        .insert("threshold".into(), weight.into());

    for pre in 0..inputs {
        for post in 0..outputs {
            net.connect(
                NeuronId {
                    group: "in".into(),
                    id: pre,
                },
                NeuronId {
                    group: "out".into(),
                    id: post,
                },
                weight,
            )?;
        }
    }
    let origin = CoreLocation {
        tile: 0,
        core_offset: 0,
    };
    for group_name in ["in", "out"] {
        let count = net.group(group_name)?.neurons.len();
        for id in 0..count {
            net.map_neuron(
                &NeuronId {
                    group: group_name.into(),
                    id,
                },
                origin,
            )?;
        }
    }
    Ok(net)
}

/// Remap every neuron across the architecture's cores in round-robin
/// order.
///
/// # Errors
///
/// Propagates network lookup errors.
pub fn map_round_robin(net: &mut SpikingNetwork, arch: &Architecture) -> Result<()> {
    let mut slots = Vec::new();
    for (tile, config) in arch.tiles.iter().enumerate() {
        for core_offset in 0..config.cores.len() {
            slots.push(CoreLocation { tile, core_offset });
        }
    }
    let mut next = 0;
    let ids: Vec<NeuronId> = net
        .groups
        .iter()
        .flat_map(|g| {
            let group = g.name.clone();
            g.neurons.iter().map(move |n| NeuronId {
                group: group.clone(),
                id: n.id,
            })
        })
        .collect();
    for id in ids {
        net.map_neuron(&id, slots[next % slots.len()])?;
        next += 1;
    }
    Ok(())
}
