// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::ConfigError;

/// Load a configuration file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = ?path, "read config file");
    Ok(toml::from_str(&contents)?)
}

/// Parse TOML text and validate it.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile, ConfigError> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Load a configuration file and validate it.
///
/// This is the entry point for the rest of the application; every
/// configuration-time error surfaces here, before any stage runs.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let raw = load_from_path(&path)?;
    ConfigFile::try_from(raw)
}

/// `Scopebuild.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Scopebuild.toml")
}
