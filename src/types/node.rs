//! Node records.

use std::fmt;

use crate::types::value::{NetworkId, NodeId, ValueId};

/// Registry key: a device within a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    /// Network the device belongs to.
    pub network_id: NetworkId,
    /// Device within the network.
    pub node_id: NodeId,
}

impl NodeKey {
    /// Creates a new key.
    #[must_use]
    pub const fn new(network_id: NetworkId, node_id: NodeId) -> Self {
        Self {
            network_id,
            node_id,
        }
    }
}

impl From<&ValueId> for NodeKey {
    fn from(value: &ValueId) -> Self {
        Self::new(value.network_id(), value.node_id())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}/{}", self.network_id, self.node_id)
    }
}

/// Local state for one discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Network the device belongs to.
    pub network_id: NetworkId,
    /// Device within the network.
    pub node_id: NodeId,
    /// Whether periodic refresh is enabled. Tracked but never acted upon.
    pub polled: bool,
    /// Values in discovery order.
    pub values: Vec<ValueId>,
}

impl NodeRecord {
    /// Creates an empty, unpolled record.
    #[must_use]
    pub const fn new(network_id: NetworkId, node_id: NodeId) -> Self {
        Self {
            network_id,
            node_id,
            polled: false,
            values: Vec::new(),
        }
    }

    /// Returns this record's registry key.
    #[must_use]
    pub const fn key(&self) -> NodeKey {
        NodeKey::new(self.network_id, self.node_id)
    }

    /// Appends a value.
    pub fn add_value(&mut self, value: ValueId) {
        self.values.push(value);
    }

    /// Removes the first entry equal to `value`.
    ///
    /// Returns false if the value was not present.
    pub fn remove_value(&mut self, value: &ValueId) -> bool {
        if let Some(pos) = self.values.iter().position(|v| v == value) {
            self.values.remove(pos);
            true
        } else {
            false
        }
    }

    /// Iterates over values of the given command class, in discovery order.
    pub fn values_of_class(&self, command_class: u8) -> impl Iterator<Item = &ValueId> {
        self.values
            .iter()
            .filter(move |v| v.command_class() == command_class)
    }
}
