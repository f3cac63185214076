// src/dag/mod.rs

//! Stage graph and scheduling.
//!
//! - [`stage`] defines builtin and per-package stages.
//! - [`graph`] holds the typed stage graph.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   stages are ready and which are blocked by a failed upstream.
//! - [`stage_info`] provides per-stage run state and scheduled stage types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod stage;
pub mod stage_info;
pub mod state_manager;

pub use graph::StageGraph;
pub use scheduler::{Scheduler, StageOutcome};
pub use scheduler_step::SchedulerStep;
pub use stage::{BuiltinStage, Stage, StageKind, StageName, RESERVED_TASK_NAMES};
pub use stage_info::{ScheduledStage, StageRunState};
