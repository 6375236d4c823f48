//! Notification watcher.
//!
//! The watcher is the single consumer of the driver's notification stream.
//! It applies each notification to the [`NodeRegistry`] and releases the
//! [`InitBarrier`] when discovery has progressed far enough. Notifications
//! are handled one at a time, in arrival order, each with the registry lock
//! held for the whole handler.

use tokio::task::JoinHandle;

use crate::barrier::InitBarrier;
use crate::driver::Driver;
use crate::event::{Notification, NotificationReceiver};
use crate::registry::NodeRegistry;
use crate::types::NodeRecord;

/// Applies driver notifications to the registry and barrier.
pub struct Watcher<D> {
    registry: NodeRegistry,
    barrier: InitBarrier,
    driver: D,
    cancel_on_node_added: bool,
}

impl<D: Driver> Watcher<D> {
    /// Creates a watcher feeding `registry` and `barrier`.
    #[must_use]
    pub const fn new(registry: NodeRegistry, barrier: InitBarrier, driver: D) -> Self {
        Self {
            registry,
            barrier,
            driver,
            cancel_on_node_added: false,
        }
    }

    /// When set, every node-added notification asks the driver to cancel the
    /// controller command running on that network.
    #[must_use]
    pub const fn cancel_on_node_added(mut self, enabled: bool) -> Self {
        self.cancel_on_node_added = enabled;
        self
    }

    /// Applies one notification.
    #[allow(clippy::too_many_lines)]
    pub async fn handle(&self, notification: Notification) {
        let mut table = self.registry.lock().await;

        match notification {
            Notification::ValueAdded(value) => {
                if let Some(record) = table.find_mut(value.network_id(), value.node_id()) {
                    tracing::debug!("value {value} added");
                    record.add_value(value);
                }
            }
            Notification::ValueRemoved(value) => {
                if table
                    .find_mut(value.network_id(), value.node_id())
                    .is_some_and(|record| record.remove_value(&value))
                {
                    tracing::debug!("value {value} removed");
                }
            }
            Notification::ValueChanged(value) | Notification::ValueRefreshed(value) => {
                if table.find(value.network_id(), value.node_id()).is_some() {
                    tracing::trace!("value {value} reported");
                }
            }
            Notification::Group { node, group } => {
                if table.find(node.network_id, node.node_id).is_some() {
                    tracing::trace!("node {node} group {group} changed");
                }
            }
            Notification::NodeAdded(node) => {
                if table.insert(NodeRecord::new(node.network_id, node.node_id)) {
                    tracing::debug!("node {node} added");
                } else {
                    tracing::warn!("node {node} added twice, keeping existing record");
                }
                if self.cancel_on_node_added {
                    match self.driver.cancel_controller_command(node.network_id).await {
                        Ok(true) => {}
                        Ok(false) => tracing::debug!("no controller command to cancel"),
                        Err(e) => tracing::warn!("cancel controller command failed: {e}"),
                    }
                }
            }
            Notification::NodeRemoved(node) => {
                if table.remove(node.network_id, node.node_id).is_some() {
                    tracing::debug!("node {node} removed");
                }
            }
            Notification::NodeEvent { node, event } => {
                if table.find(node.network_id, node.node_id).is_some() {
                    tracing::trace!("node {node} event {event}");
                }
            }
            Notification::PollingDisabled(node) => {
                if let Some(record) = table.find_mut(node.network_id, node.node_id) {
                    record.polled = false;
                }
            }
            Notification::PollingEnabled(node) => {
                if let Some(record) = table.find_mut(node.network_id, node.node_id) {
                    record.polled = true;
                }
            }
            Notification::DriverReady { network_id } => {
                tracing::info!("driver ready, network {network_id:08x}");
                self.barrier.set_active_network(network_id);
            }
            Notification::DriverFailed { network_id } => {
                tracing::error!("driver failed on network {network_id:08x}");
                self.barrier.fail();
            }
            Notification::AwakeNodesQueried { .. }
            | Notification::AllNodesQueried { .. }
            | Notification::AllNodesQueriedSomeDead { .. } => {
                tracing::info!(
                    "{:?}, {} nodes known",
                    notification.packet_type(),
                    table.len()
                );
                self.barrier.signal();
            }
            Notification::NodeNew(_)
            | Notification::NodeProtocolInfo(_)
            | Notification::NodeNaming(_)
            | Notification::EssentialNodeQueriesComplete(_)
            | Notification::NodeQueriesComplete(_)
            | Notification::DriverReset { .. }
            | Notification::DriverRemoved { .. }
            | Notification::Status { .. } => {}
        }
    }

    /// Consumes notifications until the stream ends.
    pub async fn run(self, mut notifications: NotificationReceiver) {
        while let Some(notification) = notifications.recv().await {
            self.handle(notification).await;
        }
        tracing::debug!("notification stream closed");
    }
}

impl<D: Driver + 'static> Watcher<D> {
    /// Runs the watcher on its own task.
    #[must_use]
    pub fn spawn(self, notifications: NotificationReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(notifications))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use tokio::sync::mpsc;

    use super::*;
    use crate::barrier::InitState;
    use crate::error::Result;
    use crate::types::{NetworkId, NodeKey, ValueGenre, ValueId, ValueType, command_class};

    #[derive(Default)]
    struct CancelLog {
        cancelled: Mutex<Vec<NetworkId>>,
    }

    impl Driver for CancelLog {
        fn set_value(&self, _value: ValueId, _state: bool) -> BoxFuture<'_, Result<bool>> {
            Box::pin(async { Ok(true) })
        }

        fn value_as_string(&self, _value: ValueId) -> BoxFuture<'_, Result<String>> {
            Box::pin(async { Ok(String::new()) })
        }

        fn cancel_controller_command(&self, network_id: NetworkId) -> BoxFuture<'_, Result<bool>> {
            self.cancelled.lock().unwrap().push(network_id);
            Box::pin(async { Ok(true) })
        }
    }

    fn watcher() -> Watcher<CancelLog> {
        Watcher::new(NodeRegistry::new(), InitBarrier::new(), CancelLog::default())
    }

    fn value(node: u8, cc: u8, index: u16) -> ValueId {
        ValueId::new(1, node, ValueGenre::User, cc, 1, index, ValueType::Bool)
    }

    #[tokio::test]
    async fn test_node_lifecycle() {
        let w = watcher();
        w.handle(Notification::NodeAdded(NodeKey::new(1, 2))).await;
        w.handle(Notification::NodeAdded(NodeKey::new(1, 3))).await;
        w.handle(Notification::NodeRemoved(NodeKey::new(1, 2))).await;
        w.handle(Notification::NodeRemoved(NodeKey::new(1, 42))).await;

        let keys: Vec<NodeKey> = w.registry.snapshot().await.iter().map(NodeRecord::key).collect();
        assert_eq!(keys, vec![NodeKey::new(1, 3)]);
    }

    #[tokio::test]
    async fn test_value_multiset_in_order() {
        let w = watcher();
        let a = value(5, command_class::SWITCH_BINARY, 0);
        let b = value(5, command_class::METER, 0);
        let c = value(5, command_class::BASIC, 0);

        w.handle(Notification::NodeAdded(NodeKey::new(1, 5))).await;
        for v in [a, b, a, c] {
            w.handle(Notification::ValueAdded(v)).await;
        }
        w.handle(Notification::ValueRemoved(a)).await;
        w.handle(Notification::ValueRemoved(value(5, command_class::BATTERY, 0)))
            .await;

        let record = w.registry.get(1, 5).await.unwrap();
        assert_eq!(record.values, vec![b, a, c]);
    }

    #[tokio::test]
    async fn test_value_for_unknown_node_is_ignored() {
        let w = watcher();
        w.handle(Notification::ValueAdded(value(8, command_class::BASIC, 0)))
            .await;
        assert!(w.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_polling_flags() {
        let w = watcher();
        let node = NodeKey::new(1, 7);
        w.handle(Notification::NodeAdded(node)).await;

        w.handle(Notification::PollingEnabled(node)).await;
        assert!(w.registry.get(1, 7).await.unwrap().polled);

        w.handle(Notification::PollingDisabled(node)).await;
        assert!(!w.registry.get(1, 7).await.unwrap().polled);
    }

    #[tokio::test]
    async fn test_placeholder_notifications_leave_state_alone() {
        let w = watcher();
        let node = NodeKey::new(1, 7);
        let v = value(7, command_class::SWITCH_BINARY, 0);
        w.handle(Notification::NodeAdded(node)).await;
        w.handle(Notification::ValueAdded(v)).await;
        let before = w.registry.snapshot().await;

        w.handle(Notification::ValueChanged(v)).await;
        w.handle(Notification::Group { node, group: 1 }).await;
        w.handle(Notification::NodeEvent { node, event: 0xff }).await;
        w.handle(Notification::NodeNaming(node)).await;
        w.handle(Notification::DriverReset { network_id: 1 }).await;

        assert_eq!(w.registry.snapshot().await, before);
        assert_eq!(w.barrier.state(), InitState::Pending);
    }

    #[tokio::test]
    async fn test_ready_records_network_without_release() {
        let w = watcher();
        w.handle(Notification::DriverReady { network_id: 0xc0ff_ee00 })
            .await;
        assert_eq!(w.barrier.active_network(), Some(0xc0ff_ee00));
        assert_eq!(w.barrier.state(), InitState::Pending);
    }

    #[tokio::test]
    async fn test_each_queried_kind_releases() {
        for n in [
            Notification::AwakeNodesQueried { network_id: 1 },
            Notification::AllNodesQueried { network_id: 1 },
            Notification::AllNodesQueriedSomeDead { network_id: 1 },
        ] {
            let w = watcher();
            w.handle(n).await;
            assert_eq!(w.barrier.state(), InitState::Ready);
            assert_eq!(w.barrier.signals(), 1);
        }
    }

    #[tokio::test]
    async fn test_driver_failed_releases_with_failure() {
        let w = watcher();
        w.handle(Notification::DriverFailed { network_id: 1 }).await;
        assert_eq!(w.barrier.wait().await, InitState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_on_node_added() {
        let w = watcher().cancel_on_node_added(true);
        w.handle(Notification::NodeAdded(NodeKey::new(9, 2))).await;
        assert_eq!(*w.driver.cancelled.lock().unwrap(), vec![9]);

        let quiet = watcher();
        quiet.handle(Notification::NodeAdded(NodeKey::new(9, 2))).await;
        assert!(quiet.driver.cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_stream_in_order() {
        let registry = NodeRegistry::new();
        let barrier = InitBarrier::new();
        let w = Watcher::new(registry.clone(), barrier.clone(), CancelLog::default());

        let (tx, rx) = mpsc::unbounded_channel();
        let task = w.spawn(rx);

        tx.send(Notification::NodeAdded(NodeKey::new(1, 21))).unwrap();
        tx.send(Notification::ValueAdded(value(21, command_class::SWITCH_BINARY, 0)))
            .unwrap();
        tx.send(Notification::AllNodesQueried { network_id: 1 }).unwrap();

        assert_eq!(barrier.wait().await, InitState::Ready);
        assert_eq!(registry.get(1, 21).await.unwrap().values.len(), 1);

        drop(tx);
        task.await.unwrap();
    }
}
