//! Packet type definitions for the coordinator bridge protocol.
//!
//! Packet types are the first byte of a received payload and indicate
//! what kind of data follows. Responses to commands live below `0x80`,
//! unsolicited notifications at `0x80` and above.

/// Response and notification packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    // Command responses (0x00-0x7F)
    /// Command executed successfully.
    Ok = 0x00,
    /// Command failed with error.
    Error = 0x01,
    /// Human-readable rendering of a value.
    ValueString = 0x02,

    // Notifications (0x80-0x96)
    /// A value was discovered on a node.
    ValueAdded = 0x80,
    /// A value was removed from a node.
    ValueRemoved = 0x81,
    /// A value reported a new state.
    ValueChanged = 0x82,
    /// A value was refreshed with an unchanged state.
    ValueRefreshed = 0x83,
    /// An association group changed.
    Group = 0x84,
    /// A node never seen before joined the network.
    NodeNew = 0x85,
    /// A node was added to the node list.
    NodeAdded = 0x86,
    /// A node was removed from the node list.
    NodeRemoved = 0x87,
    /// Basic protocol information is known for a node.
    NodeProtocolInfo = 0x88,
    /// Name or location of a node changed.
    NodeNaming = 0x89,
    /// A node sent a basic set or hail.
    NodeEvent = 0x8A,
    /// Polling was disabled for a node.
    PollingDisabled = 0x8B,
    /// Polling was enabled for a node.
    PollingEnabled = 0x8C,
    /// The driver initialized the controller.
    DriverReady = 0x8D,
    /// The driver could not initialize the controller.
    DriverFailed = 0x8E,
    /// The driver was reset and all nodes dropped.
    DriverReset = 0x8F,
    /// Essential queries for a node finished.
    EssentialNodeQueriesComplete = 0x90,
    /// All queries for a node finished.
    NodeQueriesComplete = 0x91,
    /// Every awake node was queried.
    AwakeNodesQueried = 0x92,
    /// Every node was queried, some are dead.
    AllNodesQueriedSomeDead = 0x93,
    /// Every node was queried.
    AllNodesQueried = 0x94,
    /// Controller or node status code.
    Notification = 0x95,
    /// The driver was removed.
    DriverRemoved = 0x96,
}

impl PacketType {
    /// Attempts to parse a packet type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Ok),
            0x01 => Some(Self::Error),
            0x02 => Some(Self::ValueString),
            0x80 => Some(Self::ValueAdded),
            0x81 => Some(Self::ValueRemoved),
            0x82 => Some(Self::ValueChanged),
            0x83 => Some(Self::ValueRefreshed),
            0x84 => Some(Self::Group),
            0x85 => Some(Self::NodeNew),
            0x86 => Some(Self::NodeAdded),
            0x87 => Some(Self::NodeRemoved),
            0x88 => Some(Self::NodeProtocolInfo),
            0x89 => Some(Self::NodeNaming),
            0x8A => Some(Self::NodeEvent),
            0x8B => Some(Self::PollingDisabled),
            0x8C => Some(Self::PollingEnabled),
            0x8D => Some(Self::DriverReady),
            0x8E => Some(Self::DriverFailed),
            0x8F => Some(Self::DriverReset),
            0x90 => Some(Self::EssentialNodeQueriesComplete),
            0x91 => Some(Self::NodeQueriesComplete),
            0x92 => Some(Self::AwakeNodesQueried),
            0x93 => Some(Self::AllNodesQueriedSomeDead),
            0x94 => Some(Self::AllNodesQueried),
            0x95 => Some(Self::Notification),
            0x96 => Some(Self::DriverRemoved),
            _ => None,
        }
    }

    /// Returns true if this is an unsolicited notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        (*self as u8) >= 0x80
    }

    /// Returns true if this is a response to a command.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        !self.is_notification()
    }

    /// Returns true if the notification payload carries a packed value id.
    #[must_use]
    pub const fn carries_value(&self) -> bool {
        matches!(
            self,
            Self::ValueAdded | Self::ValueRemoved | Self::ValueChanged | Self::ValueRefreshed
        )
    }
}

impl From<PacketType> for u8 {
    fn from(pkt: PacketType) -> Self {
        pkt as Self
    }
}
