// src/exec/toolchain.rs

//! The seam between stages and the external build toolchain.

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use crate::dag::StageName;
use crate::errors::StageError;
use crate::exec::cancel::CancelSignal;
use crate::types::StageCommand;

/// Everything a toolchain needs to perform one stage.
#[derive(Debug, Clone)]
pub struct ToolchainRequest {
    pub stage: StageName,
    pub command: StageCommand,
    /// Root of the materialized snapshot; the working directory.
    pub source_root: PathBuf,
    /// Empty directory the toolchain writes its artifacts into.
    pub out_dir: PathBuf,
    /// Location of the upstream's published artifact set, if any.
    pub upstream_artifacts: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// A toolchain invocation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainOutput {
    pub exit_code: i32,
    /// Tail of the captured output, oldest line first.
    pub diagnostics: Vec<String>,
}

impl ToolchainOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs stage commands.
///
/// `Ok` means the command ran to completion, whatever its exit code.
/// `Err` is reserved for invocations that never ran or were cut short
/// (spawn failure, timeout, cancellation).
pub trait Toolchain: Send + Sync + Debug {
    fn invoke(
        &self,
        request: ToolchainRequest,
        cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ToolchainOutput, StageError>> + Send + '_>>;
}
