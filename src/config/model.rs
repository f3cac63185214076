// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::types::StageCommand;

/// Raw configuration as deserialized from TOML.
///
/// ```toml
/// [config]
/// jobs = 4
/// store = ".scopebuild/store"
///
/// [stage.build]
/// command = "cargo build --workspace --locked"
///
/// [package.nautilus]
/// dir = "nautilus"
/// modules = ["lib", "nautilus_core"]
/// ```
///
/// All sections are optional. Convert into a validated [`ConfigFile`] with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Overrides for builtin stages, keyed by stage name
    /// (`deps`, `build`, `test`, `lint`, `doc`).
    #[serde(default)]
    pub stage: BTreeMap<String, StageOverride>,

    /// Deliverable binaries, keyed by binary name.
    #[serde(default)]
    pub package: BTreeMap<String, PackageConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    stage: BTreeMap<String, StageOverride>,
    package: BTreeMap<String, PackageConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        stage: BTreeMap<String, StageOverride>,
        package: BTreeMap<String, PackageConfig>,
    ) -> Self {
        Self {
            config,
            stage,
            package,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn stage_override(&self, name: &str) -> Option<&StageOverride> {
        self.stage.get(name)
    }

    pub fn packages(&self) -> &BTreeMap<String, PackageConfig> {
        &self.package
    }

    /// Apply command-line overrides for `jobs` / `store`.
    ///
    /// The override is held to the same rules as the file: zero jobs is
    /// rejected.
    pub fn with_overrides(
        mut self,
        jobs: Option<usize>,
        store: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(jobs) = jobs {
            if jobs == 0 {
                return Err(ConfigError::ZeroJobs);
            }
            self.config.jobs = jobs;
        }
        if let Some(store) = store {
            self.config.store = store;
        }
        Ok(self)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Maximum number of stages executing at the same time.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Artifact store root; relative paths resolve against the workspace root.
    #[serde(default = "default_store")]
    pub store: String,

    /// Paths (relative to the workspace root) that are never part of any
    /// snapshot.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_store() -> String {
    ".scopebuild/store".to_string()
}

fn default_ignore() -> Vec<String> {
    vec![".git".to_string(), "target".to_string()]
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            store: default_store(),
            ignore: default_ignore(),
        }
    }
}

/// `[stage.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageOverride {
    #[serde(default)]
    pub command: Option<StageCommand>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl StageOverride {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// `[package.<binary>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// The package's own directory.
    pub dir: String,

    /// Collaborator directories whose contents also feed this package's build.
    #[serde(default)]
    pub modules: Vec<String>,

    /// Packaging command; defaults to `cargo build --release --locked --bin <name>`.
    #[serde(default)]
    pub command: Option<StageCommand>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PackageConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
