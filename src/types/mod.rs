//! Data types shared across the crate.
//!
//! - Value identifiers and command classes
//! - Node records and registry keys

pub mod node;
pub mod value;

pub use node::{NodeKey, NodeRecord};
pub use value::{NetworkId, NodeId, ValueGenre, ValueId, ValueType, command_class};
