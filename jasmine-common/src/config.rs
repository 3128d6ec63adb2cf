//! Configuration file resolution and loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config file (`<config_dir>/jasmine/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A path given explicitly (1 or 2) must exist. The platform file is optional.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "JASMINE_CONFIG";

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit `--config` argument
    CommandLine(PathBuf),
    /// Environment variable
    Environment(PathBuf),
    /// Platform config directory
    PlatformFile(PathBuf),
    /// No file, compiled defaults
    Defaults,
}

impl ConfigSource {
    /// Path of the file backing this source, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::PlatformFile(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

/// Resolve which config file to use
pub fn resolve_config_source(cli_arg: Option<&Path>, env_var_name: &str) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigSource::CommandLine(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return ConfigSource::Environment(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config file, only if present
    if let Some(path) = default_config_path() {
        if path.exists() {
            return ConfigSource::PlatformFile(path);
        }
    }

    // Priority 4: Compiled defaults
    ConfigSource::Defaults
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jasmine").join("config.toml"))
}

/// Load a TOML config of type `T` from the resolved source
///
/// Missing fields fall back to `T::default()` through serde defaults on `T`.
pub fn load_config<T>(cli_arg: Option<&Path>, env_var_name: &str) -> Result<(T, ConfigSource)>
where
    T: DeserializeOwned + Default,
{
    let source = resolve_config_source(cli_arg, env_var_name);

    let config = match source.path() {
        Some(path) => {
            let config = load_toml_file(path)?;
            info!(path = %path.display(), "Loaded configuration file");
            config
        }
        None => {
            debug!("No configuration file found, using compiled defaults");
            T::default()
        }
    };

    Ok((config, source))
}

/// Parse a single TOML file
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
