// src/dag/stage_info.rs

//! Per-stage run state kept by the scheduler.

use crate::dag::stage::{Stage, StageName};
use crate::store::ArtifactSet;

/// Per-run state of a stage (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Requested for this run, waiting on its upstream or a free worker.
    Pending,
    /// Handed to the executor.
    Running,
    /// Toolchain succeeded or the cache supplied the artifact set.
    Succeeded,
    /// Toolchain failed, was cancelled, or timed out.
    Failed,
    /// Never started because its upstream did not succeed.
    Blocked,
    /// Never started because the run was shut down.
    Skipped,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }
}

/// Public, read-only view of a stage's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRunState {
    /// The stage was not requested in this run.
    NotInRun,
    Pending,
    Running,
    Succeeded,
    Failed,
    Blocked,
    Skipped,
}

impl From<Option<RunState>> for StageRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => StageRunState::NotInRun,
            Some(RunState::Pending) => StageRunState::Pending,
            Some(RunState::Running) => StageRunState::Running,
            Some(RunState::Succeeded) => StageRunState::Succeeded,
            Some(RunState::Failed) => StageRunState::Failed,
            Some(RunState::Blocked) => StageRunState::Blocked,
            Some(RunState::Skipped) => StageRunState::Skipped,
        }
    }
}

/// Static stage information plus per-run state.
#[derive(Debug, Clone)]
pub struct StageInfo {
    pub name: StageName,
    pub upstream: Option<StageName>,
    pub run_state: Option<RunState>,
    /// Artifact set of the last success in this run.
    pub artifacts: Option<ArtifactSet>,
    /// The failed upstream, when `run_state` is `Blocked`.
    pub blocked_by: Option<StageName>,
}

impl StageInfo {
    pub fn from_stage(stage: &Stage) -> Self {
        Self {
            name: stage.name().to_string(),
            upstream: stage.upstream().map(str::to_string),
            run_state: None,
            artifacts: None,
            blocked_by: None,
        }
    }
}

/// A stage the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledStage {
    pub stage: Stage,
    /// The upstream's artifact set, handed over as a build accelerant.
    pub upstream_artifacts: Option<ArtifactSet>,
}
