//! Post-parse spiking-network model.
//!
//! A network is a set of neuron groups; a group is a collection of neurons
//! sharing default attributes and default hardware-unit names. Connections
//! reference neurons by `(group, id)`. Every neuron that should simulate
//! carries an explicit mapping to a `(tile, core)` location.

use crate::attribute::AttributeValue;
use crate::error::{NetworkError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Identity of one neuron: group name plus index within the group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeuronId {
    /// Parent group name.
    pub group: String,
    /// Index within the group.
    pub id: usize,
}

impl std::fmt::Display for NeuronId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.group, self.id)
    }
}

/// Placement of a neuron on the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreLocation {
    /// Tile id (index into the architecture's tile list).
    pub tile: usize,
    /// Core offset within the tile.
    pub core_offset: usize,
}

/// One neuron: attribute overrides, trace flags and its chip placement.
#[derive(Debug, Clone)]
pub struct Neuron {
    /// Index within the parent group.
    pub id: usize,
    /// Attribute overrides applied on top of the group defaults.
    pub attributes: HashMap<String, AttributeValue>,
    /// Record this neuron in the spike trace.
    pub log_spikes: bool,
    /// Record this neuron in the potential trace.
    pub log_potential: bool,
    /// Update the soma every timestep even without input.
    pub force_update: bool,
    /// Spikes to force regardless of soma state (consumed one per timestep).
    pub forced_spikes: u32,
    /// Where this neuron runs. `None` until the mapper assigns it.
    pub mapping: Option<CoreLocation>,
}

impl Neuron {
    fn new(id: usize) -> Self {
        Self {
            id,
            attributes: HashMap::new(),
            log_spikes: false,
            log_potential: false,
            force_update: false,
            forced_spikes: 0,
            mapping: None,
        }
    }
}

/// A group of neurons sharing defaults and a common soma model.
#[derive(Debug, Clone)]
pub struct NeuronGroup {
    /// Group name, unique within the network.
    pub name: String,
    /// Neurons in id order.
    pub neurons: Vec<Neuron>,
    /// Default attributes, overridden per neuron.
    pub default_attributes: HashMap<String, AttributeValue>,
    /// Soma unit name this group maps onto (e.g. `"soma"`).
    pub soma_hw_name: String,
    /// Synapse unit name inbound connections default to.
    pub synapse_hw_name: String,
    /// Default spike-trace flag.
    pub default_log_spikes: bool,
    /// Default potential-trace flag.
    pub default_log_potential: bool,
}

impl NeuronGroup {
    /// Effective attributes of `neuron`: group defaults overlaid with the
    /// neuron's own overrides.
    #[must_use]
    pub fn effective_attributes(&self, neuron: &Neuron) -> HashMap<String, AttributeValue> {
        let mut attrs = self.default_attributes.clone();
        for (k, v) in &neuron.attributes {
            attrs.insert(k.clone(), v.clone());
        }
        attrs
    }
}

/// One synaptic connection between two neurons.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Spiking (source) neuron.
    pub pre_neuron: NeuronId,
    /// Receiving neuron.
    pub post_neuron: NeuronId,
    /// Synaptic weight.
    pub weight: f64,
    /// Synapse unit at the destination core handling this connection.
    pub synapse_hw_name: String,
    /// Parameters forwarded to the destination dendrite unit.
    pub dendrite_params: HashMap<String, AttributeValue>,
}

/// The complete network: groups plus the flat connection list.
#[derive(Debug, Clone, Default)]
pub struct SpikingNetwork {
    /// Groups in creation order.
    pub groups: Vec<NeuronGroup>,
    /// All connections, in creation order.
    pub connections: Vec<Connection>,
}

impl SpikingNetwork {
    /// Create an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a neuron group of `neuron_count` neurons.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicateGroup`] if the name is taken.
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        neuron_count: usize,
    ) -> Result<&mut NeuronGroup> {
        let name = name.into();
        if self.groups.iter().any(|g| g.name == name) {
            return Err(NetworkError::DuplicateGroup { group: name });
        }
        debug!("creating group {name} with {neuron_count} neurons");
        self.groups.push(NeuronGroup {
            name,
            neurons: (0..neuron_count).map(Neuron::new).collect(),
            default_attributes: HashMap::new(),
            soma_hw_name: "soma".to_string(),
            synapse_hw_name: "synapse".to_string(),
            default_log_spikes: false,
            default_log_potential: false,
        });
        Ok(self.groups.last_mut().expect("just pushed"))
    }

    /// Look up a group by name.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownGroup`] if absent.
    pub fn group(&self, name: &str) -> Result<&NeuronGroup> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| NetworkError::unknown_group(name))
    }

    /// Mutable group lookup.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownGroup`] if absent.
    pub fn group_mut(&mut self, name: &str) -> Result<&mut NeuronGroup> {
        self.groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| NetworkError::unknown_group(name))
    }

    /// Look up a neuron by identity.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownGroup`] or
    /// [`NetworkError::UnknownNeuron`].
    pub fn neuron(&self, nid: &NeuronId) -> Result<&Neuron> {
        self.group(&nid.group)?
            .neurons
            .get(nid.id)
            .ok_or_else(|| NetworkError::UnknownNeuron {
                group: nid.group.clone(),
                id: nid.id,
            })
    }

    /// Connect `pre` to `post` with the given weight and no extra dendrite
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if either endpoint does not exist.
    pub fn connect(&mut self, pre: NeuronId, post: NeuronId, weight: f64) -> Result<()> {
        self.neuron(&pre)?;
        self.neuron(&post)?;
        let synapse_hw_name = self.group(&post.group)?.synapse_hw_name.clone();
        self.connections.push(Connection {
            pre_neuron: pre,
            post_neuron: post,
            weight,
            synapse_hw_name,
            dendrite_params: HashMap::new(),
        });
        Ok(())
    }

    /// Map one neuron to a core.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the neuron does not exist.
    pub fn map_neuron(&mut self, nid: &NeuronId, location: CoreLocation) -> Result<()> {
        let group = self.group_mut(&nid.group)?;
        let neuron = group
            .neurons
            .get_mut(nid.id)
            .ok_or_else(|| NetworkError::UnknownNeuron {
                group: nid.group.clone(),
                id: nid.id,
            })?;
        neuron.mapping = Some(location);
        Ok(())
    }

    /// Total neuron count across all groups.
    #[must_use]
    pub fn neuron_count(&self) -> usize {
        self.groups.iter().map(|g| g.neurons.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(group: &str, id: usize) -> NeuronId {
        NeuronId {
            group: group.to_string(),
            id,
        }
    }

    #[test]
    fn duplicate_group_rejected() {
        let mut net = SpikingNetwork::new();
        net.create_group("in", 4).unwrap();
        assert!(matches!(
            net.create_group("in", 2),
            Err(NetworkError::DuplicateGroup { .. })
        ));
    }

    #[test]
    fn connect_validates_endpoints() {
        let mut net = SpikingNetwork::new();
        net.create_group("in", 2).unwrap();
        net.create_group("out", 2).unwrap();
        net.connect(nid("in", 0), nid("out", 1), 1.5).unwrap();
        assert!(net.connect(nid("in", 5), nid("out", 0), 1.0).is_err());
        assert!(net.connect(nid("in", 0), nid("hidden", 0), 1.0).is_err());
        assert_eq!(net.connections.len(), 1);
    }

    #[test]
    fn effective_attributes_overlay() {
        let mut net = SpikingNetwork::new();
        let group = net.create_group("g", 2).unwrap();
        group
            .default_attributes
            .insert("threshold".into(), 2.0.into());
        group.neurons[1]
            .attributes
            .insert("threshold".into(), 5.0.into());

        let group = net.group("g").unwrap();
        let defaults = group.effective_attributes(&group.neurons[0]);
        let overridden = group.effective_attributes(&group.neurons[1]);
        assert_eq!(defaults["threshold"], AttributeValue::Float(2.0));
        assert_eq!(overridden["threshold"], AttributeValue::Float(5.0));
    }

    #[test]
    fn mapping_assignment() {
        let mut net = SpikingNetwork::new();
        net.create_group("g", 1).unwrap();
        net.map_neuron(
            &nid("g", 0),
            CoreLocation {
                tile: 0,
                core_offset: 1,
            },
        )
        .unwrap();
        assert_eq!(
            net.neuron(&nid("g", 0)).unwrap().mapping,
            Some(CoreLocation {
                tile: 0,
                core_offset: 1
            })
        );
    }
}
