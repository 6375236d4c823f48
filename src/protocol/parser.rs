//! Binary payload parsing for the coordinator bridge protocol.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::FrameError;
use crate::event::{Event, Notification};
use crate::protocol::PacketType;
use crate::types::{NodeKey, ValueId};

/// Size of the `[network:4LE] [node:1]` prefix shared by all notifications.
const NOTIFICATION_HEADER: usize = 5;

/// Size of a packed value id without its network.
const PACKED_VALUE: usize = 8;

fn ensure(what: &'static str, data: &[u8], expected: usize) -> Result<(), FrameError> {
    if data.len() < expected {
        return Err(FrameError::Truncated {
            what,
            expected,
            got: data.len(),
        });
    }
    Ok(())
}

/// Parses a command response payload (packet type byte already stripped).
#[must_use]
pub fn parse_response(packet_type: PacketType, data: &[u8]) -> Option<Event> {
    match packet_type {
        PacketType::Ok => Some(Event::Ok),
        PacketType::Error => Some(Event::Error {
            message: String::from_utf8_lossy(data).into_owned(),
        }),
        PacketType::ValueString => Some(Event::ValueString(
            String::from_utf8_lossy(data).into_owned(),
        )),
        _ => None,
    }
}

/// Parses a notification payload (packet type byte already stripped).
///
/// Format:
/// ```text
/// [network:4LE] [node:1] [extra...]
/// ```
/// where `extra` is a packed value id (8 bytes LE) for value notifications,
/// the event byte for node events, the group index for group changes and
/// the status code for status notifications.
pub fn parse_notification(packet_type: PacketType, data: &[u8]) -> Result<Notification, FrameError> {
    ensure("notification", data, NOTIFICATION_HEADER)?;

    let mut cursor = data;
    let network_id = cursor.get_u32_le();
    let node = NodeKey::new(network_id, cursor.get_u8());

    if packet_type.carries_value() {
        ensure("value id", cursor, PACKED_VALUE)?;
        let packed = cursor.get_u64_le();
        let value = ValueId::from_packed(network_id, packed)
            .ok_or(FrameError::InvalidValueId(packed))?;
        return Ok(match packet_type {
            PacketType::ValueAdded => Notification::ValueAdded(value),
            PacketType::ValueRemoved => Notification::ValueRemoved(value),
            PacketType::ValueChanged => Notification::ValueChanged(value),
            _ => Notification::ValueRefreshed(value),
        });
    }

    let extra = |what| {
        ensure(what, cursor, 1)?;
        Ok::<u8, FrameError>(cursor[0])
    };

    let notification = match packet_type {
        PacketType::Group => Notification::Group {
            node,
            group: extra("group")?,
        },
        PacketType::NodeEvent => Notification::NodeEvent {
            node,
            event: extra("node event")?,
        },
        PacketType::Notification => Notification::Status {
            node,
            code: extra("status")?,
        },
        PacketType::NodeNew => Notification::NodeNew(node),
        PacketType::NodeAdded => Notification::NodeAdded(node),
        PacketType::NodeRemoved => Notification::NodeRemoved(node),
        PacketType::NodeProtocolInfo => Notification::NodeProtocolInfo(node),
        PacketType::NodeNaming => Notification::NodeNaming(node),
        PacketType::PollingDisabled => Notification::PollingDisabled(node),
        PacketType::PollingEnabled => Notification::PollingEnabled(node),
        PacketType::EssentialNodeQueriesComplete => {
            Notification::EssentialNodeQueriesComplete(node)
        }
        PacketType::NodeQueriesComplete => Notification::NodeQueriesComplete(node),
        PacketType::DriverReady => Notification::DriverReady { network_id },
        PacketType::DriverFailed => Notification::DriverFailed { network_id },
        PacketType::DriverReset => Notification::DriverReset { network_id },
        PacketType::DriverRemoved => Notification::DriverRemoved { network_id },
        PacketType::AwakeNodesQueried => Notification::AwakeNodesQueried { network_id },
        PacketType::AllNodesQueried => Notification::AllNodesQueried { network_id },
        PacketType::AllNodesQueriedSomeDead => {
            Notification::AllNodesQueriedSomeDead { network_id }
        }
        PacketType::Ok
        | PacketType::Error
        | PacketType::ValueString
        | PacketType::ValueAdded
        | PacketType::ValueRemoved
        | PacketType::ValueChanged
        | PacketType::ValueRefreshed => {
            return Err(FrameError::NotNotification(packet_type.into()));
        }
    };

    Ok(notification)
}

/// Writes a value id in wire form: `[network:4LE] [packed:8LE]`.
pub fn put_value_id(buf: &mut BytesMut, value: &ValueId) {
    buf.put_u32_le(value.network_id());
    buf.put_u64_le(value.packed());
}
