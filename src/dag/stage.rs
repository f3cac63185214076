// src/dag/stage.rs

use std::fmt;
use std::time::Duration;

use crate::config::model::{PackageConfig, StageOverride};
use crate::errors::ScopeConfigError;
use crate::scope::{deps_only_scope, full_workspace_scope, per_package_scope, Scope};
use crate::types::StageCommand;

/// Canonical stage name type used throughout the graph and engine.
pub type StageName = String;

/// Names a package may not take: builtin stages plus CLI task aliases.
pub const RESERVED_TASK_NAMES: &[&str] = &["deps", "build", "test", "lint", "doc", "clippy", "all"];

/// The fixed workspace stages.
///
/// ```text
/// deps ──> build ──> test
///   │             ├─> lint
///   │             └─> doc
///   └──> <one package-build per binary>
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStage {
    Deps,
    Build,
    Test,
    Lint,
    Doc,
}

impl BuiltinStage {
    pub const ALL: [BuiltinStage; 5] = [
        BuiltinStage::Deps,
        BuiltinStage::Build,
        BuiltinStage::Test,
        BuiltinStage::Lint,
        BuiltinStage::Doc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::Deps => "deps",
            BuiltinStage::Build => "build",
            BuiltinStage::Test => "test",
            BuiltinStage::Lint => "lint",
            BuiltinStage::Doc => "doc",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn upstream(&self) -> Option<BuiltinStage> {
        match self {
            BuiltinStage::Deps => None,
            BuiltinStage::Build => Some(BuiltinStage::Deps),
            BuiltinStage::Test | BuiltinStage::Lint | BuiltinStage::Doc => {
                Some(BuiltinStage::Build)
            }
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            BuiltinStage::Deps => deps_only_scope(),
            _ => full_workspace_scope(),
        }
    }

    pub fn default_command(&self) -> StageCommand {
        match self {
            BuiltinStage::Deps => StageCommand::argv(["cargo", "fetch", "--locked"]),
            BuiltinStage::Build => {
                StageCommand::argv(["cargo", "build", "--workspace", "--release", "--locked"])
            }
            BuiltinStage::Test => {
                StageCommand::argv(["cargo", "test", "--workspace", "--release", "--locked"])
            }
            BuiltinStage::Lint => StageCommand::argv([
                "cargo",
                "clippy",
                "--workspace",
                "--all-targets",
                "--release",
                "--locked",
                "--",
                "--deny",
                "warnings",
            ]),
            BuiltinStage::Doc => {
                StageCommand::argv(["cargo", "doc", "--workspace", "--no-deps", "--locked"])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKind {
    Builtin(BuiltinStage),
    /// Packaging of one deliverable binary.
    Package { binary: String },
}

/// One node of the stage graph: what it reads, what it reuses, what it runs.
#[derive(Debug, Clone)]
pub struct Stage {
    name: StageName,
    kind: StageKind,
    scope: Scope,
    upstream: Option<StageName>,
    command: StageCommand,
    timeout: Option<Duration>,
}

impl Stage {
    pub fn new(
        name: impl Into<StageName>,
        kind: StageKind,
        scope: Scope,
        upstream: Option<StageName>,
        command: StageCommand,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            scope,
            upstream,
            command,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// A builtin stage with optional configuration overrides applied.
    pub fn builtin(stage: BuiltinStage, over: Option<&StageOverride>) -> Self {
        let command = over
            .and_then(|o| o.command.clone())
            .unwrap_or_else(|| stage.default_command());
        Self::new(
            stage.name(),
            StageKind::Builtin(stage),
            stage.scope(),
            stage.upstream().map(|u| u.name().to_string()),
            command,
        )
        .with_timeout(over.and_then(StageOverride::timeout))
    }

    /// The package-build stage for `binary`, reusing the `deps` artifacts.
    pub fn package(binary: &str, cfg: &PackageConfig) -> Result<Self, ScopeConfigError> {
        let scope = per_package_scope(&cfg.dir, &cfg.modules)?;
        let command = cfg.command.clone().unwrap_or_else(|| {
            StageCommand::argv(["cargo", "build", "--release", "--locked", "--bin", binary])
        });
        Ok(Self::new(
            binary,
            StageKind::Package {
                binary: binary.to_string(),
            },
            scope,
            Some(BuiltinStage::Deps.name().to_string()),
            command,
        )
        .with_timeout(cfg.timeout()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StageKind {
        &self.kind
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn upstream(&self) -> Option<&str> {
        self.upstream.as_deref()
    }

    pub fn command(&self) -> &StageCommand {
        &self.command
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.upstream {
            Some(up) => write!(f, "{} (after {})", self.name, up),
            None => f.write_str(&self.name),
        }
    }
}
