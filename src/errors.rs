// src/errors.rs

//! Crate-wide error types.
//!
//! The taxonomy follows the lifecycle of a build:
//! - [`FilterError`] and [`ScopeConfigError`] (plus [`ConfigError`]) are
//!   configuration-time errors and abort before any stage executes.
//! - [`StageError`] is local to one stage and its dependents.
//! - [`CacheStoreError`] is fatal for the whole invocation.

use std::path::PathBuf;

use thiserror::Error;

/// The root tree could not be read.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("source root does not exist: {0:?}")]
    RootMissing(PathBuf),

    #[error("source root is not a directory: {0:?}")]
    RootNotDirectory(PathBuf),

    #[error("path {path:?} is not under source root {root:?}")]
    OutsideRoot { root: PathBuf, path: PathBuf },

    #[error("reading {path:?}: {cause:#}")]
    Io { path: PathBuf, cause: anyhow::Error },

    #[error("{0:?} changed while its snapshot was being materialized")]
    Changed(PathBuf),
}

/// A scope could not be constructed from its declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeConfigError {
    #[error("a per-package scope needs a non-empty own directory")]
    EmptyOwnDir,

    #[error("module directory must not be empty")]
    EmptyModule,

    #[error("module directory '{0}' must be relative to the workspace root")]
    AbsoluteDir(String),

    #[error("module directory '{0}' must not contain '..'")]
    ParentTraversal(String),

    #[error("invalid rule pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Semantic errors in the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("[config].jobs must be >= 1 (got 0)")]
    ZeroJobs,

    #[error("package '{name}': {source}")]
    Package {
        name: String,
        #[source]
        source: ScopeConfigError,
    },

    #[error("package name '{0}' collides with a builtin task name")]
    ReservedName(String),

    #[error("unknown stage '{0}' in [stage] overrides")]
    UnknownStage(String),

    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),

    #[error("stage '{stage}' declares unknown upstream '{upstream}'")]
    UnknownUpstream { stage: String, upstream: String },

    #[error("cycle detected in stage graph involving stage '{0}'")]
    StageCycle(String),

    #[error("command for stage '{0}' is empty")]
    EmptyCommand(String),

    #[error("lint command must deny warnings (add `-D warnings`), got: {0}")]
    LintNotDenyingWarnings(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("reading config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A stage's toolchain invocation did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("stage '{stage}' failed ({})", describe_exit(.exit_code, .cancelled))]
pub struct StageError {
    pub stage: String,
    /// Process exit code; `None` when the process was killed or never started.
    pub exit_code: Option<i32>,
    /// Tail of the captured stdout/stderr, oldest line first.
    pub diagnostics: Vec<String>,
    /// Set when the invocation was cancelled or timed out.
    pub cancelled: bool,
}

impl StageError {
    pub fn exited(stage: impl Into<String>, exit_code: i32, diagnostics: Vec<String>) -> Self {
        Self {
            stage: stage.into(),
            exit_code: Some(exit_code),
            diagnostics,
            cancelled: false,
        }
    }

    pub fn cancelled(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            exit_code: None,
            diagnostics: vec![reason.into()],
            cancelled: true,
        }
    }

    pub fn not_run(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            exit_code: None,
            diagnostics: vec![message.into()],
            cancelled: false,
        }
    }
}

fn describe_exit(code: &Option<i32>, cancelled: &bool) -> String {
    match (code, cancelled) {
        (_, true) => "cancelled".to_string(),
        (Some(code), false) => format!("exit code {code}"),
        (None, false) => "toolchain did not run".to_string(),
    }
}

/// The artifact store could not be read or written.
#[derive(Error, Debug)]
pub enum CacheStoreError {
    #[error("artifact store io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt manifest for key {key}: {message}")]
    CorruptManifest { key: String, message: String },

    #[error("artifact store lock poisoned")]
    Poisoned,
}

impl CacheStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheStoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ScopebuildError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    ScopeConfig(#[from] ScopeConfigError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("artifact store failure: {0}")]
    CacheStore(#[from] CacheStoreError),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScopebuildError>;
