//! Binary switch control.

use crate::driver::Driver;
use crate::error::Result;
use crate::registry::NodeRegistry;
use crate::types::{NodeId, ValueId, command_class};

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Number of values the new state was submitted to.
    pub submitted: usize,
    /// Acceptance reported for the last submission.
    ///
    /// Stays `true` when nothing was submitted, so check
    /// [`matched`](Self::matched) to tell a miss from a success.
    pub accepted: bool,
}

impl ToggleOutcome {
    /// Returns true if at least one value was addressed.
    #[must_use]
    pub const fn matched(&self) -> bool {
        self.submitted > 0
    }
}

/// Sends on/off commands to devices known to the registry.
pub struct SwitchController<D> {
    registry: NodeRegistry,
    driver: D,
}

impl<D: Driver> SwitchController<D> {
    /// Creates a controller reading `registry` and submitting through `driver`.
    #[must_use]
    pub const fn new(registry: NodeRegistry, driver: D) -> Self {
        Self { registry, driver }
    }

    /// Returns the driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Switches every binary switch value of `node_id` to `state`.
    ///
    /// The device id is matched on every network, so a device id present on
    /// two networks is switched on both.
    pub async fn toggle(&self, node_id: NodeId, state: bool) -> Result<ToggleOutcome> {
        self.set_bool(node_id, command_class::SWITCH_BINARY, state)
            .await
    }

    /// Submits `state` to every value of `command_class` on `node_id`.
    ///
    /// The registry lock is held until the last submission returns.
    pub async fn set_bool(
        &self,
        node_id: NodeId,
        command_class: u8,
        state: bool,
    ) -> Result<ToggleOutcome> {
        tracing::info!("setting node {node_id} to {state}");

        let table = self.registry.lock().await;
        let mut outcome = ToggleOutcome {
            submitted: 0,
            accepted: true,
        };

        for record in table.find_by_node(node_id) {
            tracing::debug!(
                "node {} has {} values",
                record.key(),
                record.values.len()
            );
            for value in record.values_of_class(command_class) {
                tracing::debug!("submitting {state} to {value}");
                outcome.accepted = self.driver.set_value(*value, state).await?;
                outcome.submitted += 1;
            }
        }

        if !outcome.matched() {
            tracing::warn!("node {node_id} has no value of class 0x{command_class:02x}");
        }
        Ok(outcome)
    }

    /// Reads back every binary switch value of `node_id` as text.
    ///
    /// Values whose read fails are logged and left out.
    pub async fn describe(&self, node_id: NodeId) -> Vec<(ValueId, String)> {
        let values: Vec<ValueId> = {
            let table = self.registry.lock().await;
            table
                .find_by_node(node_id)
                .flat_map(|r| r.values_of_class(command_class::SWITCH_BINARY))
                .copied()
                .collect()
        };

        let mut described = Vec::with_capacity(values.len());
        for value in values {
            match self.driver.value_as_string(value).await {
                Ok(text) => described.push((value, text)),
                Err(e) => tracing::warn!("failed to read {value}: {e}"),
            }
        }
        described
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::error::Error;
    use crate::types::{NetworkId, NodeRecord, ValueGenre, ValueType};

    const UNREADABLE_INDEX: u16 = 9;

    #[derive(Default)]
    struct RecordingDriver {
        submissions: Mutex<Vec<(ValueId, bool)>>,
        verdicts: Mutex<VecDeque<Result<bool>>>,
    }

    impl Driver for RecordingDriver {
        fn set_value(&self, value: ValueId, state: bool) -> BoxFuture<'_, Result<bool>> {
            self.submissions.lock().unwrap().push((value, state));
            let verdict = self.verdicts.lock().unwrap().pop_front().unwrap_or(Ok(true));
            Box::pin(async move { verdict })
        }

        fn value_as_string(&self, value: ValueId) -> BoxFuture<'_, Result<String>> {
            Box::pin(async move {
                if value.index() == UNREADABLE_INDEX {
                    return Err(Error::Timeout { timeout_ms: 5000 });
                }
                Ok(format!("index {}", value.index()))
            })
        }

        fn cancel_controller_command(&self, _network_id: NetworkId) -> BoxFuture<'_, Result<bool>> {
            Box::pin(async { Ok(true) })
        }
    }

    fn value(network: NetworkId, node: NodeId, cc: u8, index: u16) -> ValueId {
        ValueId::new(network, node, ValueGenre::User, cc, 1, index, ValueType::Bool)
    }

    async fn registry_with(records: Vec<NodeRecord>) -> NodeRegistry {
        let registry = NodeRegistry::new();
        {
            let mut table = registry.lock().await;
            for record in records {
                table.insert(record);
            }
        }
        registry
    }

    #[tokio::test]
    async fn test_toggle_single_switch() {
        let h = value(1, 21, command_class::SWITCH_BINARY, 0);
        let mut record = NodeRecord::new(1, 21);
        record.add_value(value(1, 21, command_class::BASIC, 0));
        record.add_value(h);

        let controller =
            SwitchController::new(registry_with(vec![record]).await, RecordingDriver::default());
        let outcome = controller.toggle(21, true).await.unwrap();

        assert_eq!(
            outcome,
            ToggleOutcome {
                submitted: 1,
                accepted: true
            }
        );
        assert_eq!(*controller.driver.submissions.lock().unwrap(), vec![(h, true)]);
    }

    #[tokio::test]
    async fn test_toggle_unknown_node_is_vacuous() {
        let controller =
            SwitchController::new(NodeRegistry::new(), RecordingDriver::default());
        let outcome = controller.toggle(99, true).await.unwrap();

        assert!(outcome.accepted);
        assert!(!outcome.matched());
        assert!(controller.driver.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_on_then_off_in_order() {
        let a = value(1, 4, command_class::SWITCH_BINARY, 0);
        let b = value(1, 4, command_class::SWITCH_BINARY, 1);
        let mut record = NodeRecord::new(1, 4);
        record.add_value(a);
        record.add_value(b);

        let controller =
            SwitchController::new(registry_with(vec![record]).await, RecordingDriver::default());
        controller.toggle(4, true).await.unwrap();
        controller.toggle(4, false).await.unwrap();

        assert_eq!(
            *controller.driver.submissions.lock().unwrap(),
            vec![(a, true), (b, true), (a, false), (b, false)]
        );
    }

    #[tokio::test]
    async fn test_toggle_acts_on_every_network() {
        let mut first = NodeRecord::new(1, 15);
        first.add_value(value(1, 15, command_class::SWITCH_BINARY, 0));
        let mut second = NodeRecord::new(2, 15);
        second.add_value(value(2, 15, command_class::SWITCH_BINARY, 0));

        let controller = SwitchController::new(
            registry_with(vec![first, second]).await,
            RecordingDriver::default(),
        );
        let outcome = controller.toggle(15, false).await.unwrap();

        assert_eq!(outcome.submitted, 2);
        let networks: Vec<NetworkId> = controller
            .driver
            .submissions
            .lock()
            .unwrap()
            .iter()
            .map(|(v, _)| v.network_id())
            .collect();
        assert_eq!(networks, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_last_submission_wins() {
        let mut record = NodeRecord::new(1, 4);
        record.add_value(value(1, 4, command_class::SWITCH_BINARY, 0));
        record.add_value(value(1, 4, command_class::SWITCH_BINARY, 1));

        let driver = RecordingDriver::default();
        driver
            .verdicts
            .lock()
            .unwrap()
            .extend([Ok(false), Ok(true)]);
        let controller = SwitchController::new(registry_with(vec![record.clone()]).await, driver);
        assert!(controller.toggle(4, true).await.unwrap().accepted);

        let driver = RecordingDriver::default();
        driver
            .verdicts
            .lock()
            .unwrap()
            .extend([Ok(true), Ok(false)]);
        let controller = SwitchController::new(registry_with(vec![record]).await, driver);
        assert!(!controller.toggle(4, true).await.unwrap().accepted);
    }

    #[tokio::test]
    async fn test_driver_error_propagates() {
        let mut record = NodeRecord::new(1, 4);
        record.add_value(value(1, 4, command_class::SWITCH_BINARY, 0));

        let driver = RecordingDriver::default();
        driver
            .verdicts
            .lock()
            .unwrap()
            .push_back(Err(Error::Timeout { timeout_ms: 5000 }));
        let controller = SwitchController::new(registry_with(vec![record]).await, driver);

        assert!(matches!(
            controller.toggle(4, true).await,
            Err(Error::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_describe_reads_switch_values() {
        let mut record = NodeRecord::new(1, 4);
        record.add_value(value(1, 4, command_class::METER, 0));
        record.add_value(value(1, 4, command_class::SWITCH_BINARY, 3));

        let controller =
            SwitchController::new(registry_with(vec![record]).await, RecordingDriver::default());
        let described = controller.describe(4).await;

        assert_eq!(described.len(), 1);
        assert_eq!(described[0].1, "index 3");
    }

    #[tokio::test]
    async fn test_describe_skips_failed_reads() {
        let readable = value(1, 4, command_class::SWITCH_BINARY, 0);
        let mut record = NodeRecord::new(1, 4);
        record.add_value(value(1, 4, command_class::SWITCH_BINARY, UNREADABLE_INDEX));
        record.add_value(readable);

        let controller =
            SwitchController::new(registry_with(vec![record]).await, RecordingDriver::default());
        assert!(controller.toggle(4, true).await.unwrap().accepted);

        let described = controller.describe(4).await;
        assert_eq!(described, vec![(readable, "index 0".to_string())]);
        assert!(controller.describe(99).await.is_empty());
    }
}
