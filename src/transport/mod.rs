//! Transport layer for coordinator communication.
//!
//! Currently only USB/Serial is implemented.

pub mod serial;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Opens the endpoint.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Closes the endpoint.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Sends one payload, framed by the transport.
    fn send(&mut self, payload: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;

    /// Starts a background task forwarding every inbound frame payload to
    /// `frame_tx`.
    ///
    /// Returns `None` if the transport is not connected or its reader is
    /// already running.
    fn spawn_reader(&mut self, frame_tx: mpsc::Sender<Bytes>) -> Option<JoinHandle<()>>;
}

pub use serial::{SerialConfig, SerialTransport};
