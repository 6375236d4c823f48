//! Command-line interface.

use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::transport::serial::DEFAULT_PORT;
use crate::types::NodeId;

/// Device switched when `--node` is not given.
pub const DEFAULT_NODE: NodeId = 15;

/// Switches a binary switch on a mesh network through a serial coordinator.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "zwswitch", version, about)]
pub struct Cli {
    /// Serial device of the coordinator.
    #[arg(short, long, default_value = DEFAULT_PORT)]
    pub port: String,

    /// Configuration directory.
    #[arg(short, long, default_value = "./config/")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long)]
    pub verbose: bool,

    /// Read `on`/`off` commands from stdin.
    #[arg(short, long)]
    pub interactive: bool,

    /// Keep toggling, flipping the state after every command.
    #[arg(short, long, conflicts_with = "interactive")]
    pub repeat: bool,

    /// Device id to switch.
    #[arg(short, long, default_value_t = DEFAULT_NODE)]
    pub node: NodeId,

    /// Give up waiting for the network after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Pause between commands in repeat mode, in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 1)]
    pub interval: u64,

    /// Initial state: 0 for off, any other integer for on.
    #[arg(
        value_name = "STATUS",
        required_unless_present = "interactive",
        allow_negative_numbers = true,
        value_parser = parse_status
    )]
    pub status: Option<i64>,
}

/// What the process does once the network is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Send one command and exit.
    Once(bool),
    /// Send commands forever, starting with the given state.
    Repeat(bool),
    /// Take commands from stdin.
    Interactive,
}

impl Cli {
    /// Resolves the run mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.interactive {
            return Mode::Interactive;
        }
        let state = self.status.unwrap_or(0) != 0;
        if self.repeat {
            Mode::Repeat(state)
        } else {
            Mode::Once(state)
        }
    }

    /// Barrier timeout, if any.
    #[must_use]
    pub fn init_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Pause between repeated commands.
    #[must_use]
    pub const fn repeat_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

/// Splits an interactive input line into switch states.
///
/// `on` and `off` map to `Ok(true)` and `Ok(false)`; any other token is
/// returned as `Err` and ends the session.
pub fn commands(line: &str) -> impl Iterator<Item = Result<bool, &str>> {
    line.split_whitespace().map(|token| match token {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(other),
    })
}

/// States sent in repeat mode: `initial`, then alternating.
pub fn repeat_states(initial: bool) -> impl Iterator<Item = bool> {
    std::iter::successors(Some(initial), |state| Some(!state))
}

/// Reads the leading integer of `s`, like C `atoi`.
///
/// Leading whitespace and one sign are accepted; anything without leading
/// digits reads as 0. Out-of-range values saturate.
pub fn parse_status(s: &str) -> Result<i64, Infallible> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    Ok(if negative { -magnitude } else { magnitude })
}
