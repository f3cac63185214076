// src/config/mod.rs

//! Configuration loading and validation for scopebuild.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: `RawConfigFile -> ConfigFile` with fail-fast checks on
//!   jobs, package scopes, reserved names and the lint policy.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_and_validate};
pub use model::{ConfigFile, ConfigSection, PackageConfig, RawConfigFile, StageOverride};
