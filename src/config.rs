//! Driver options.
//!
//! Options live in `options.toml` inside the configuration directory:
//!
//! ```toml
//! log_dir = "logs"
//! poll_interval_ms = 500
//! interval_between_polls = true
//! validate_value_changes = true
//! command_timeout_ms = 5000
//! baud_rate = 115200
//! log_level = "info"
//! ```
//!
//! Every key is optional. Unknown keys are rejected.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::transport::serial::DEFAULT_BAUD_RATE;

/// Directory searched when the requested one does not exist.
pub const FALLBACK_DIR: &str = "config";

/// Name of the options file inside the configuration directory.
pub const OPTIONS_FILE: &str = "options.toml";

/// Options applied when starting the driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Directory for driver logs, relative to the working directory.
    pub log_dir: PathBuf,
    /// Interval between polls of polled devices.
    pub poll_interval_ms: u64,
    /// Spread polls evenly over the interval instead of polling in bursts.
    pub interval_between_polls: bool,
    /// Drop value reports that look like transmission glitches.
    pub validate_value_changes: bool,
    /// How long a command waits for the bridge to answer.
    pub command_timeout_ms: u64,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Log filter used when neither `RUST_LOG` nor `--verbose` is given.
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            poll_interval_ms: 500,
            interval_between_polls: true,
            validate_value_changes: true,
            command_timeout_ms: 5000,
            baud_rate: DEFAULT_BAUD_RATE,
            log_level: "info".into(),
        }
    }
}

impl Options {
    /// Loads options from the first existing configuration directory.
    ///
    /// `dir` is tried first, then [`FALLBACK_DIR`]. A directory without an
    /// options file yields the defaults.
    pub fn load(dir: impl AsRef<Path>) -> Result<(Self, PathBuf), ConfigError> {
        let dir = locate(dir.as_ref(), Path::new(FALLBACK_DIR))?;
        let options = Self::from_file(&dir.join(OPTIONS_FILE))?;
        Ok((options, dir))
    }

    /// Reads one options file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.message().to_string())
    }

    /// Command timeout as a duration.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Returns the first existing directory among `dir` and `fallback`.
fn locate(dir: &Path, fallback: &Path) -> Result<PathBuf, ConfigError> {
    let mut searched = vec![dir.to_path_buf()];
    if dir != fallback {
        searched.push(fallback.to_path_buf());
    }

    for candidate in &searched {
        if candidate.is_dir() {
            return Ok(candidate.clone());
        }
    }
    Err(ConfigError::NotFound { searched })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (options, found) = Options::load(dir.path()).unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(found, dir.path());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(OPTIONS_FILE),
            "command_timeout_ms = 1500\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let (options, _) = Options::load(dir.path()).unwrap();
        assert_eq!(options.command_timeout(), Duration::from_millis(1500));
        assert_eq!(options.log_level, "debug");
        assert_eq!(options.baud_rate, 115_200);
        assert_eq!(options.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OPTIONS_FILE);
        fs::write(&path, "save_configuration = true\n").unwrap();

        let err = Options::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: p, .. } if p == path));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OPTIONS_FILE);
        fs::write(&path, "baud_rate = \"fast\"\n").unwrap();

        assert!(matches!(
            Options::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_directory_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let fallback = dir.path().join("config");

        match locate(&missing, &fallback) {
            Err(ConfigError::NotFound { searched }) => {
                assert_eq!(searched, vec![missing, fallback]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_directory_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("config");
        fs::create_dir(&fallback).unwrap();

        let found = locate(&dir.path().join("nope"), &fallback).unwrap();
        assert_eq!(found, fallback);
    }
}
