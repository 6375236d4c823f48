//! Node registry.
//!
//! The registry owns every [`NodeRecord`] behind one lock. Callers that need
//! to find and then mutate a record take the lock once through
//! [`NodeRegistry::lock`] and do both on the same [`NodeTable`] guard, so no
//! notification can slip in between.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::types::{NetworkId, NodeId, NodeKey, NodeRecord};

/// Records keyed by network and device, in discovery order.
#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: IndexMap<NodeKey, NodeRecord>,
}

impl NodeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a record by network and device.
    #[must_use]
    pub fn find(&self, network_id: NetworkId, node_id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&NodeKey::new(network_id, node_id))
    }

    /// Looks up a record by network and device for mutation.
    pub fn find_mut(&mut self, network_id: NetworkId, node_id: NodeId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(&NodeKey::new(network_id, node_id))
    }

    /// Returns every record with the given device id, across all networks.
    ///
    /// A device id is only unique within one network, so with several
    /// networks attached this can return more than one record.
    pub fn find_by_node(&self, node_id: NodeId) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values().filter(move |r| r.node_id == node_id)
    }

    /// Inserts a record.
    ///
    /// Returns false and leaves the table untouched if a record with the
    /// same key already exists.
    pub fn insert(&mut self, record: NodeRecord) -> bool {
        let key = record.key();
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.nodes.insert(key, record);
        true
    }

    /// Removes and returns a record, keeping the order of the others.
    pub fn remove(&mut self, network_id: NetworkId, node_id: NodeId) -> Option<NodeRecord> {
        self.nodes.shift_remove(&NodeKey::new(network_id, node_id))
    }

    /// Returns true if a record for this network and device exists.
    #[must_use]
    pub fn contains(&self, network_id: NetworkId, node_id: NodeId) -> bool {
        self.nodes.contains_key(&NodeKey::new(network_id, node_id))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Iterates over keys in discovery order.
    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Shared handle to a [`NodeTable`].
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    table: Arc<Mutex<NodeTable>>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the registry lock.
    ///
    /// Everything done through the returned guard forms one critical
    /// section, including any awaits made while holding it.
    pub async fn lock(&self) -> MutexGuard<'_, NodeTable> {
        self.table.lock().await
    }

    /// Runs `f` on the table with the lock held.
    pub async fn with<R>(&self, f: impl FnOnce(&mut NodeTable) -> R) -> R {
        let mut table = self.lock().await;
        f(&mut table)
    }

    /// Returns a copy of every record in discovery order.
    pub async fn snapshot(&self) -> Vec<NodeRecord> {
        self.lock().await.iter().cloned().collect()
    }

    /// Returns a copy of one record.
    pub async fn get(&self, network_id: NetworkId, node_id: NodeId) -> Option<NodeRecord> {
        self.lock().await.find(network_id, node_id).cloned()
    }

    /// Returns true if a record for this network and device exists.
    pub async fn contains(&self, network_id: NetworkId, node_id: NodeId) -> bool {
        self.lock().await.contains(network_id, node_id)
    }

    /// Returns the key of every record in discovery order.
    pub async fn node_ids(&self) -> Vec<NodeKey> {
        self.lock().await.keys().copied().collect()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.lock().await.len()
    }

    /// Returns true if no device is known.
    pub async fn is_empty(&self) -> bool {
        self.lock().await.is_empty()
    }

    /// Drops every record.
    pub async fn clear(&self) {
        self.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ValueGenre, ValueId, ValueType, command_class};

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let mut table = NodeTable::new();
        let mut first = NodeRecord::new(1, 5);
        first.polled = true;

        assert!(table.insert(first));
        assert!(!table.insert(NodeRecord::new(1, 5)));
        assert_eq!(table.len(), 1);
        assert!(table.find(1, 5).unwrap().polled);
    }

    #[test]
    fn test_find_by_node_spans_networks() {
        let mut table = NodeTable::new();
        table.insert(NodeRecord::new(1, 15));
        table.insert(NodeRecord::new(1, 3));
        table.insert(NodeRecord::new(2, 15));

        let networks: Vec<NetworkId> = table.find_by_node(15).map(|r| r.network_id).collect();
        assert_eq!(networks, vec![1, 2]);
        assert_eq!(table.find_by_node(99).count(), 0);
    }

    #[test]
    fn test_remove_keeps_discovery_order() {
        let mut table = NodeTable::new();
        for node in [4, 9, 2, 7] {
            table.insert(NodeRecord::new(1, node));
        }

        assert!(table.remove(1, 9).is_some());
        assert!(table.remove(1, 9).is_none());

        let order: Vec<NodeId> = table.keys().map(|k| k.node_id).collect();
        assert_eq!(order, vec![4, 2, 7]);
    }

    #[test]
    fn test_remove_drops_values() {
        let mut table = NodeTable::new();
        let mut record = NodeRecord::new(1, 4);
        record.add_value(ValueId::new(
            1,
            4,
            ValueGenre::User,
            command_class::SWITCH_BINARY,
            1,
            0,
            ValueType::Bool,
        ));
        table.insert(record);

        let removed = table.remove(1, 4).unwrap();
        assert_eq!(removed.values.len(), 1);
        assert!(table.find(1, 4).is_none());
    }

    #[tokio::test]
    async fn test_with_applies_find_then_mutate_atomically() {
        let registry = NodeRegistry::new();
        registry
            .with(|table| table.insert(NodeRecord::new(1, 8)))
            .await;

        let polled = registry
            .with(|table| {
                let record = table.find_mut(1, 8)?;
                record.polled = true;
                Some(record.polled)
            })
            .await;
        assert_eq!(polled, Some(true));
        assert!(registry.with(|table| table.find_mut(1, 9).is_none()).await);
        assert!(registry.get(1, 8).await.unwrap().polled);
    }

    #[tokio::test]
    async fn test_registry_snapshot() {
        let registry = NodeRegistry::new();
        {
            let mut table = registry.lock().await;
            table.insert(NodeRecord::new(1, 1));
            table.insert(NodeRecord::new(1, 15));
        }

        assert_eq!(registry.len().await, 2);
        assert!(registry.contains(1, 15).await);
        assert!(!registry.contains(2, 15).await);
        assert_eq!(
            registry.node_ids().await,
            vec![NodeKey::new(1, 1), NodeKey::new(1, 15)]
        );
        assert_eq!(registry.get(1, 15).await, Some(NodeRecord::new(1, 15)));

        let clone = registry.clone();
        clone.clear().await;
        assert!(registry.is_empty().await);
        assert!(registry.snapshot().await.is_empty());
    }
}
