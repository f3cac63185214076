#![allow(dead_code)]

use scopebuild::config::{ConfigFile, PackageConfig, RawConfigFile, StageOverride};
use scopebuild::errors::ConfigError;
use scopebuild::types::StageCommand;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.config.jobs = 4;
        Self { config }
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = jobs;
        self
    }

    pub fn store(mut self, store: &str) -> Self {
        self.config.config.store = store.to_string();
        self
    }

    pub fn stage_command(mut self, stage: &str, command: &str) -> Self {
        self.config
            .stage
            .entry(stage.to_string())
            .or_insert_with(StageOverride::default)
            .command = Some(StageCommand::Shell(command.to_string()));
        self
    }

    pub fn stage_timeout(mut self, stage: &str, secs: u64) -> Self {
        self.config
            .stage
            .entry(stage.to_string())
            .or_insert_with(StageOverride::default)
            .timeout_secs = Some(secs);
        self
    }

    pub fn with_package(mut self, binary: &str, package: PackageConfig) -> Self {
        self.config.package.insert(binary.to_string(), package);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile, ConfigError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `PackageConfig`.
pub struct PackageBuilder {
    package: PackageConfig,
}

impl PackageBuilder {
    pub fn new(dir: &str) -> Self {
        Self {
            package: PackageConfig {
                dir: dir.to_string(),
                modules: Vec::new(),
                command: None,
                timeout_secs: None,
            },
        }
    }

    pub fn module(mut self, dir: &str) -> Self {
        self.package.modules.push(dir.to_string());
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.package.command = Some(StageCommand::Shell(command.to_string()));
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.package.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> PackageConfig {
        self.package
    }
}
