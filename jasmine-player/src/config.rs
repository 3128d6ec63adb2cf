//! Player configuration
//!
//! Loaded from TOML via `jasmine_common::config`; every field has a default so
//! an empty or absent file yields a working configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jasmine_common::config::{load_config, ConfigSource, CONFIG_ENV_VAR};

use crate::error::Result;

/// Default position poll cadence
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Past this position, "previous" restarts the current track
pub const DEFAULT_REWIND_THRESHOLD_MS: u64 = 3000;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "jasmine_player=debug,jasmine_common=info";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Position poll cadence in milliseconds
    pub poll_interval_ms: u64,

    /// `skip_previous` seeks to 0 instead of skipping when the position is
    /// strictly greater than this
    pub rewind_threshold_ms: u64,

    /// Buffer size of the session event bus
    pub event_capacity: usize,

    /// Directory for scoped temporary files (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,

    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            rewind_threshold_ms: DEFAULT_REWIND_THRESHOLD_MS,
            event_capacity: 100,
            scratch_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PlayerConfig {
    /// Resolve and load configuration (CLI path > `JASMINE_CONFIG` > platform file > defaults)
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (config, source): (Self, ConfigSource) = load_config(cli_arg, CONFIG_ENV_VAR)?;
        config.validate()?;
        Ok((config, source))
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Scratch directory for temporary files
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
