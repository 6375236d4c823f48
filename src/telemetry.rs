//! Log subscriber setup for the binary.

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Picks the log filter. `RUST_LOG` wins over `--verbose`, which wins over
/// the configured level.
fn select_filter(env: Option<String>, verbose: bool, configured: &str) -> String {
    match env {
        Some(filter) if !filter.trim().is_empty() => filter,
        _ if verbose => "debug".into(),
        _ => configured.into(),
    }
}

/// Installs the global `fmt` subscriber writing to stderr.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn initialise(verbose: bool, configured: &str) -> Result<(), String> {
    let directives = select_filter(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        verbose,
        configured,
    );
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| format!("invalid log filter '{directives}': {e}"))?;

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .map_err(|e| e.to_string())
}
