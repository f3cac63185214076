// src/config/validate.rs

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::stage::{BuiltinStage, RESERVED_TASK_NAMES};
use crate::errors::ConfigError;
use crate::scope::per_package_scope;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.stage, raw.package))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    validate_global_config(cfg)?;
    validate_stage_overrides(cfg)?;
    validate_packages(cfg)?;
    debug!(
        packages = cfg.package.len(),
        overrides = cfg.stage.len(),
        "configuration validated"
    );
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.config.jobs == 0 {
        return Err(ConfigError::ZeroJobs);
    }
    Ok(())
}

fn validate_stage_overrides(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (name, over) in cfg.stage.iter() {
        let Some(builtin) = BuiltinStage::from_name(name) else {
            return Err(ConfigError::UnknownStage(name.clone()));
        };
        let Some(command) = &over.command else {
            continue;
        };
        if command.is_empty() {
            return Err(ConfigError::EmptyCommand(name.clone()));
        }
        // Zero tolerance: a lint stage that lets warnings through would
        // report success on a dirty tree.
        if builtin == BuiltinStage::Lint && !command.denies_warnings() {
            return Err(ConfigError::LintNotDenyingWarnings(command.to_string()));
        }
    }
    Ok(())
}

fn validate_packages(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (name, pkg) in cfg.package.iter() {
        if name.trim().is_empty() || RESERVED_TASK_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::ReservedName(name.clone()));
        }
        per_package_scope(&pkg.dir, &pkg.modules).map_err(|source| ConfigError::Package {
            name: name.clone(),
            source,
        })?;
        if pkg.command.as_ref().is_some_and(|c| c.is_empty()) {
            return Err(ConfigError::EmptyCommand(name.clone()));
        }
    }
    Ok(())
}
