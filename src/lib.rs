//! # zwswitch
//!
//! Switches binary switches on a mesh home-automation network through a
//! USB serial coordinator bridge.
//!
//! The driver pushes discovery notifications to a single [`Watcher`], which
//! keeps an in-memory [`NodeRegistry`] of devices and their values and opens
//! the [`InitBarrier`] once the network has been queried. A
//! [`SwitchController`] then looks devices up in the registry and submits
//! on/off commands through the [`Driver`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use zwswitch::{InitBarrier, InitState, Manager, NodeRegistry, SerialConfig, SwitchController, Watcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), zwswitch::Error> {
//!     let mut manager = Manager::serial(SerialConfig::new("/dev/ttyACM0"));
//!     let registry = NodeRegistry::new();
//!     let barrier = InitBarrier::new();
//!
//!     manager.add_watcher(Watcher::new(registry.clone(), barrier.clone(), manager.commands()))?;
//!     manager.add_driver().await?;
//!
//!     if barrier.wait().await == InitState::Ready {
//!         let switches = SwitchController::new(registry, manager.commands());
//!         let outcome = switches.toggle(15, true).await?;
//!         println!("accepted: {}", outcome.accepted);
//!     }
//!
//!     manager.remove_driver().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Bridge wire format (frames, packets, opcodes)
//! - [`types`] - Value ids and node records
//! - [`transport`] - Serial transport
//! - [`event`] - Response broadcast and notification queue
//! - [`commands`] - Request/response commands, the serial [`Driver`]
//! - [`manager`] - Driver and watcher lifecycle
//! - [`registry`], [`watcher`], [`barrier`], [`switch`] - Device tracking and control

pub mod barrier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod switch;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod watcher;

// Re-exports for convenience
pub use barrier::{InitBarrier, InitState};
pub use commands::CommandHandler;
pub use config::Options;
pub use driver::Driver;
pub use error::{ConfigError, Error, FrameError, Result};
pub use event::{Event, EventDispatcher, EventFilter, Notification, Subscription};
pub use manager::Manager;
pub use protocol::{CommandOpcode, PacketType};
pub use registry::{NodeRegistry, NodeTable};
pub use switch::{SwitchController, ToggleOutcome};
pub use transport::{SerialConfig, SerialTransport, Transport, serial::list_ports};
pub use types::{NetworkId, NodeId, NodeKey, NodeRecord, ValueGenre, ValueId, ValueType};
pub use watcher::Watcher;
