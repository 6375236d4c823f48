//! Value identifiers.
//!
//! A [`ValueId`] names one controllable property of one device. It carries
//! everything needed to route a command (network, node, command class) so no
//! lookup table is required to address it.

use std::fmt;

/// Identifier of one coordinator network instance.
pub type NetworkId = u32;

/// Identifier of one device within a network.
pub type NodeId = u8;

/// Well-known command class identifiers.
pub mod command_class {
    /// Basic command class.
    pub const BASIC: u8 = 0x20;
    /// Binary switch (on/off) command class.
    pub const SWITCH_BINARY: u8 = 0x25;
    /// Multilevel switch command class.
    pub const SWITCH_MULTILEVEL: u8 = 0x26;
    /// Multilevel sensor command class.
    pub const SENSOR_MULTILEVEL: u8 = 0x31;
    /// Meter command class.
    pub const METER: u8 = 0x32;
    /// Configuration command class.
    pub const CONFIGURATION: u8 = 0x70;
    /// Battery command class.
    pub const BATTERY: u8 = 0x80;
}

/// Classification of a value by its intended audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueGenre {
    /// Basic values shown to casual users.
    Basic = 0,
    /// Values shown to end users.
    User = 1,
    /// Device configuration parameters.
    Config = 2,
    /// Internal values.
    System = 3,
}

impl ValueGenre {
    /// Parses a genre from its wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Basic),
            1 => Some(Self::User),
            2 => Some(Self::Config),
            3 => Some(Self::System),
            _ => None,
        }
    }
}

/// Data type held by a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Boolean.
    Bool = 0,
    /// Unsigned byte.
    Byte = 1,
    /// Decimal.
    Decimal = 2,
    /// Signed 32-bit integer.
    Int = 3,
    /// List selection.
    List = 4,
    /// Schedule.
    Schedule = 5,
    /// Signed 16-bit integer.
    Short = 6,
    /// Free text.
    String = 7,
    /// Write-only trigger.
    Button = 8,
    /// Raw bytes.
    Raw = 9,
}

impl ValueType {
    /// Parses a value type from its wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Bool),
            1 => Some(Self::Byte),
            2 => Some(Self::Decimal),
            3 => Some(Self::Int),
            4 => Some(Self::List),
            5 => Some(Self::Schedule),
            6 => Some(Self::Short),
            7 => Some(Self::String),
            8 => Some(Self::Button),
            9 => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Opaque handle for one property of one device.
///
/// Equality covers every embedded field, so two handles are equal exactly
/// when they name the same property instance on the same device of the same
/// network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId {
    network_id: NetworkId,
    node_id: NodeId,
    genre: ValueGenre,
    command_class: u8,
    instance: u8,
    index: u16,
    value_type: ValueType,
}

impl ValueId {
    /// Size of the packed wire form (network id + packed id).
    pub const WIRE_SIZE: usize = 12;

    /// Creates a new value identifier.
    #[must_use]
    pub const fn new(
        network_id: NetworkId,
        node_id: NodeId,
        genre: ValueGenre,
        command_class: u8,
        instance: u8,
        index: u16,
        value_type: ValueType,
    ) -> Self {
        Self {
            network_id,
            node_id,
            genre,
            command_class,
            instance,
            index,
            value_type,
        }
    }

    /// Network the owning device belongs to.
    #[must_use]
    pub const fn network_id(&self) -> NetworkId {
        self.network_id
    }

    /// Owning device.
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Value genre.
    #[must_use]
    pub const fn genre(&self) -> ValueGenre {
        self.genre
    }

    /// Command class (property category) of the value.
    #[must_use]
    pub const fn command_class(&self) -> u8 {
        self.command_class
    }

    /// Instance of the command class on the device.
    #[must_use]
    pub const fn instance(&self) -> u8 {
        self.instance
    }

    /// Index of the value within its command class.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Data type of the value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Packs everything except the network id into 64 bits.
    ///
    /// Layout (MSB first): node, genre, command class, instance, index (16),
    /// reserved, value type.
    #[must_use]
    pub const fn packed(&self) -> u64 {
        ((self.node_id as u64) << 56)
            | ((self.genre as u64) << 48)
            | ((self.command_class as u64) << 40)
            | ((self.instance as u64) << 32)
            | ((self.index as u64) << 16)
            | (self.value_type as u64)
    }

    /// Rebuilds a value id from a network id and its packed form.
    ///
    /// Returns `None` when the genre or type bytes are unknown.
    #[must_use]
    pub const fn from_packed(network_id: NetworkId, packed: u64) -> Option<Self> {
        let Some(genre) = ValueGenre::from_byte((packed >> 48) as u8) else {
            return None;
        };
        let Some(value_type) = ValueType::from_byte(packed as u8) else {
            return None;
        };
        Some(Self {
            network_id,
            node_id: (packed >> 56) as u8,
            genre,
            command_class: (packed >> 40) as u8,
            instance: (packed >> 32) as u8,
            index: (packed >> 16) as u16,
            value_type,
        })
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}:{}:0x{:02x}:{}:{}",
            self.network_id, self.node_id, self.command_class, self.instance, self.index
        )
    }
}
