//! Event system for coordinator traffic.
//!
//! Inbound packets are split in two streams:
//! - command responses are broadcast so any pending request can pick up its
//!   reply;
//! - notifications are queued on an unbounded channel for the single
//!   registered watcher, so none are ever dropped and the reader never waits
//!   on the watcher.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use crate::protocol::PacketType;
use crate::types::{NetworkId, NodeId, NodeKey, ValueId};

/// Response to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Command executed successfully.
    Ok,
    /// Command failed with error.
    Error { message: String },
    /// Human-readable value rendering.
    ValueString(String),
    /// Connection established.
    Connected,
    /// Connection closed.
    Disconnected,
}

impl Event {
    /// Returns the associated packet type if applicable.
    #[must_use]
    pub const fn packet_type(&self) -> Option<PacketType> {
        match self {
            Self::Ok => Some(PacketType::Ok),
            Self::Error { .. } => Some(PacketType::Error),
            Self::ValueString(_) => Some(PacketType::ValueString),
            Self::Connected | Self::Disconnected => None,
        }
    }
}

/// Topology and state notification emitted by the driver.
///
/// Every kind the driver can emit has a variant, including those the
/// watcher ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// A value was discovered.
    ValueAdded(ValueId),
    /// A value was removed.
    ValueRemoved(ValueId),
    /// A value reported a new state.
    ValueChanged(ValueId),
    /// A value was refreshed with an unchanged state.
    ValueRefreshed(ValueId),
    /// An association group of a node changed.
    Group { node: NodeKey, group: u8 },
    /// A node never seen before joined.
    NodeNew(NodeKey),
    /// A node was added to the node list.
    NodeAdded(NodeKey),
    /// A node was removed from the node list.
    NodeRemoved(NodeKey),
    /// Protocol information is known for a node.
    NodeProtocolInfo(NodeKey),
    /// A node's name or location changed.
    NodeNaming(NodeKey),
    /// A node sent a basic set or hail.
    NodeEvent { node: NodeKey, event: u8 },
    /// Polling was disabled for a node.
    PollingDisabled(NodeKey),
    /// Polling was enabled for a node.
    PollingEnabled(NodeKey),
    /// The controller for a network is ready.
    DriverReady { network_id: NetworkId },
    /// The driver failed to initialize.
    DriverFailed { network_id: NetworkId },
    /// The driver was reset.
    DriverReset { network_id: NetworkId },
    /// The driver was removed.
    DriverRemoved { network_id: NetworkId },
    /// Essential queries for a node finished.
    EssentialNodeQueriesComplete(NodeKey),
    /// All queries for a node finished.
    NodeQueriesComplete(NodeKey),
    /// Every awake node was queried.
    AwakeNodesQueried { network_id: NetworkId },
    /// Every node was queried.
    AllNodesQueried { network_id: NetworkId },
    /// Every node was queried, some are dead.
    AllNodesQueriedSomeDead { network_id: NetworkId },
    /// Controller or node status code.
    Status { node: NodeKey, code: u8 },
}

impl Notification {
    /// Returns the packet type this notification is carried in.
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::ValueAdded(_) => PacketType::ValueAdded,
            Self::ValueRemoved(_) => PacketType::ValueRemoved,
            Self::ValueChanged(_) => PacketType::ValueChanged,
            Self::ValueRefreshed(_) => PacketType::ValueRefreshed,
            Self::Group { .. } => PacketType::Group,
            Self::NodeNew(_) => PacketType::NodeNew,
            Self::NodeAdded(_) => PacketType::NodeAdded,
            Self::NodeRemoved(_) => PacketType::NodeRemoved,
            Self::NodeProtocolInfo(_) => PacketType::NodeProtocolInfo,
            Self::NodeNaming(_) => PacketType::NodeNaming,
            Self::NodeEvent { .. } => PacketType::NodeEvent,
            Self::PollingDisabled(_) => PacketType::PollingDisabled,
            Self::PollingEnabled(_) => PacketType::PollingEnabled,
            Self::DriverReady { .. } => PacketType::DriverReady,
            Self::DriverFailed { .. } => PacketType::DriverFailed,
            Self::DriverReset { .. } => PacketType::DriverReset,
            Self::DriverRemoved { .. } => PacketType::DriverRemoved,
            Self::EssentialNodeQueriesComplete(_) => PacketType::EssentialNodeQueriesComplete,
            Self::NodeQueriesComplete(_) => PacketType::NodeQueriesComplete,
            Self::AwakeNodesQueried { .. } => PacketType::AwakeNodesQueried,
            Self::AllNodesQueried { .. } => PacketType::AllNodesQueried,
            Self::AllNodesQueriedSomeDead { .. } => PacketType::AllNodesQueriedSomeDead,
            Self::Status { .. } => PacketType::Notification,
        }
    }

    /// Returns the network this notification belongs to.
    #[must_use]
    pub const fn network_id(&self) -> NetworkId {
        match self {
            Self::ValueAdded(v)
            | Self::ValueRemoved(v)
            | Self::ValueChanged(v)
            | Self::ValueRefreshed(v) => v.network_id(),
            Self::Group { node, .. }
            | Self::NodeEvent { node, .. }
            | Self::Status { node, .. }
            | Self::NodeNew(node)
            | Self::NodeAdded(node)
            | Self::NodeRemoved(node)
            | Self::NodeProtocolInfo(node)
            | Self::NodeNaming(node)
            | Self::PollingDisabled(node)
            | Self::PollingEnabled(node)
            | Self::EssentialNodeQueriesComplete(node)
            | Self::NodeQueriesComplete(node) => node.network_id,
            Self::DriverReady { network_id }
            | Self::DriverFailed { network_id }
            | Self::DriverReset { network_id }
            | Self::DriverRemoved { network_id }
            | Self::AwakeNodesQueried { network_id }
            | Self::AllNodesQueried { network_id }
            | Self::AllNodesQueriedSomeDead { network_id } => *network_id,
        }
    }

    /// Returns the node this notification refers to, if any.
    #[must_use]
    pub fn node(&self) -> Option<NodeKey> {
        match self {
            Self::ValueAdded(v)
            | Self::ValueRemoved(v)
            | Self::ValueChanged(v)
            | Self::ValueRefreshed(v) => Some(NodeKey::from(v)),
            Self::Group { node, .. }
            | Self::NodeEvent { node, .. }
            | Self::Status { node, .. }
            | Self::NodeNew(node)
            | Self::NodeAdded(node)
            | Self::NodeRemoved(node)
            | Self::NodeProtocolInfo(node)
            | Self::NodeNaming(node)
            | Self::PollingDisabled(node)
            | Self::PollingEnabled(node)
            | Self::EssentialNodeQueriesComplete(node)
            | Self::NodeQueriesComplete(node) => Some(*node),
            _ => None,
        }
    }

    /// Returns the node id this notification refers to, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        self.node().map(|key| key.node_id)
    }
}

/// A subscription to command responses.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("response subscription lagged, {missed} events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Filter over response packet types.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Accepted packet types; `None` accepts everything.
    pub packet_types: Option<Vec<PacketType>>,
}

impl EventFilter {
    /// Creates a filter for specific packet types.
    #[must_use]
    pub const fn packet_types(types: Vec<PacketType>) -> Self {
        Self {
            packet_types: Some(types),
        }
    }

    /// Checks if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match (&self.packet_types, event.packet_type()) {
            (None, _) => true,
            (Some(types), Some(pkt_type)) => types.contains(&pkt_type),
            (Some(_), None) => false,
        }
    }
}

/// Receiving end of the notification stream.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

struct EventDispatcherInner {
    responses: broadcast::Sender<Event>,
    notifications: mpsc::UnboundedSender<Notification>,
    watcher_rx: Mutex<Option<NotificationReceiver>>,
}

/// Routes responses to pending requests and notifications to the watcher.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new dispatcher with the given response buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (responses, _) = broadcast::channel(capacity);
        let (notifications, watcher_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(EventDispatcherInner {
                responses,
                notifications,
                watcher_rx: Mutex::new(Some(watcher_rx)),
            }),
        }
    }

    /// Broadcasts a response to all subscribers.
    pub fn dispatch(&self, event: Event) {
        // No subscriber means nobody is waiting for a reply.
        let _ = self.inner.responses.send(event);
    }

    /// Queues a notification for the watcher.
    ///
    /// Notifications are buffered until a watcher takes the stream, and are
    /// dropped once the watcher has gone away.
    pub fn notify(&self, notification: Notification) {
        if self.inner.notifications.send(notification).is_err() {
            tracing::debug!("watcher gone, dropping {:?}", notification.packet_type());
        }
    }

    /// Takes the notification stream. Only the first call succeeds.
    #[must_use]
    pub fn take_notifications(&self) -> Option<NotificationReceiver> {
        self.inner
            .watcher_rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
    }

    /// Subscribes to responses.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.inner.responses.subscribe(),
        }
    }

    /// Waits for a response matching the filter with timeout.
    ///
    /// Returns `None` if the timeout expires or the channel is closed.
    pub async fn wait_for(
        &self,
        filter: EventFilter,
        timeout: std::time::Duration,
    ) -> Option<Event> {
        let subscription = self.subscribe();
        wait_matching(subscription, &filter, timeout).await
    }
}

/// Waits on an existing subscription for the first matching response.
pub(crate) async fn wait_matching(
    mut subscription: Subscription,
    filter: &EventFilter,
    timeout: std::time::Duration,
) -> Option<Event> {
    tokio::select! {
        biased;
        result = async {
            while let Some(event) = subscription.recv().await {
                if filter.matches(&event) {
                    return Some(event);
                }
            }
            None
        } => result,
        () = tokio::time::sleep(timeout) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::{ValueGenre, ValueType, command_class};

    #[tokio::test]
    async fn test_response_dispatch() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe();

        dispatcher.dispatch(Event::Ok);

        let event = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(Event::Ok));
    }

    #[tokio::test]
    async fn test_notifications_buffer_until_taken() {
        let dispatcher = EventDispatcher::new(16);
        dispatcher.notify(Notification::NodeAdded(NodeKey::new(1, 2)));
        dispatcher.notify(Notification::AllNodesQueried { network_id: 1 });

        let mut rx = dispatcher.take_notifications().unwrap();
        assert!(dispatcher.take_notifications().is_none());

        assert_eq!(
            rx.recv().await,
            Some(Notification::NodeAdded(NodeKey::new(1, 2)))
        );
        assert_eq!(
            rx.recv().await,
            Some(Notification::AllNodesQueried { network_id: 1 })
        );
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let dispatcher = EventDispatcher::new(16);
        let filter = EventFilter::packet_types(vec![PacketType::Ok]);
        assert_eq!(
            dispatcher.wait_for(filter, Duration::from_millis(10)).await,
            None
        );
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::packet_types(vec![PacketType::Ok, PacketType::Error]);

        assert!(filter.matches(&Event::Ok));
        assert!(filter.matches(&Event::Error {
            message: "test".into()
        }));
        assert!(!filter.matches(&Event::ValueString("On".into())));
        assert!(!filter.matches(&Event::Connected));
        assert!(EventFilter::default().matches(&Event::Connected));
    }

    #[test]
    fn test_notification_routing_fields() {
        let value = ValueId::new(
            9,
            21,
            ValueGenre::User,
            command_class::SWITCH_BINARY,
            1,
            0,
            ValueType::Bool,
        );
        let added = Notification::ValueAdded(value);
        assert_eq!(added.network_id(), 9);
        assert_eq!(added.node(), Some(NodeKey::new(9, 21)));
        assert_eq!(added.packet_type(), PacketType::ValueAdded);

        let ready = Notification::DriverReady { network_id: 9 };
        assert_eq!(ready.node_id(), None);
        assert_eq!(ready.network_id(), 9);
    }
}
