//! Protocol definitions for the coordinator bridge.
//!
//! - Frame encoding/decoding
//! - Packet type definitions
//! - Command opcodes
//! - Payload parsing

pub mod command;
pub mod frame;
pub mod packet;
pub mod parser;

pub use command::CommandOpcode;
pub use frame::{FrameDecoder, INBOUND_HEADER, MAX_FRAME_SIZE, OUTBOUND_HEADER, encode as encode_frame};
pub use packet::PacketType;
pub use parser::{parse_notification, parse_response, put_value_id};
