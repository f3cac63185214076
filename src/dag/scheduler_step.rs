// src/dag/scheduler_step.rs

//! Step-by-step result types for the scheduler.

use crate::dag::stage::StageName;

/// Side effects of a single completion, for callers that report them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// `(stage, failed upstream)` pairs newly marked `Blocked`.
    pub newly_blocked: Vec<(StageName, StageName)>,
    /// True if this step left no pending or running stage.
    pub run_just_finished: bool,
}
