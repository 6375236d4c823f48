//! Error types for the zwswitch library.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for zwswitch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Protocol error reported by the coordinator bridge.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Command or barrier wait timed out.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// Notification or response channel closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The watcher was already registered.
    #[error("a watcher is already registered")]
    WatcherRegistered,

    /// The driver reported that it could not initialize.
    #[error("driver failed to initialize")]
    DriverFailed,

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Frame-specific errors.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame payload exceeds maximum size.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Payload shorter than its packet layout requires.
    #[error("truncated {what}: expected {expected} bytes, got {got}")]
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Packed value id with an unknown genre or type.
    #[error("invalid value id {0:#018x}")]
    InvalidValueId(u64),

    /// Packet type is not a notification.
    #[error("packet type {0:#04x} is not a notification")]
    NotNotification(u8),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the searched directories exist.
    #[error("unable to find the configuration files at {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    /// The options file exists but cannot be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The options file is not valid.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Result type alias for zwswitch operations.
pub type Result<T> = std::result::Result<T, Error>;
