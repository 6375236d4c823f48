//! Command opcodes for the coordinator bridge protocol.
//!
//! Each command starts with an opcode byte, optionally followed by parameters.

/// Command opcodes sent to the coordinator bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandOpcode {
    /// Start the driver; discovery notifications follow.
    AppStart = 0x01,
    /// Set a value: `[network:4LE] [packed:8LE] [state:1]`.
    SetValue = 0x02,
    /// Render a value as text: `[network:4LE] [packed:8LE]`.
    GetValueString = 0x03,
    /// Cancel the in-flight controller command: `[network:4LE]`.
    CancelControllerCommand = 0x04,
    /// Stop the driver.
    RemoveDriver = 0x05,
}

impl From<CommandOpcode> for u8 {
    fn from(cmd: CommandOpcode) -> Self {
        cmd as Self
    }
}
