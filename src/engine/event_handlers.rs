// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{error, info, warn};

use crate::dag::{ScheduledStage, Scheduler, StageOutcome};
use crate::errors::{CacheStoreError, StageError};
use crate::report::{RunReport, StageStatus};

use super::StageResult;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start these stages.
    DispatchStages(Vec<ScheduledStage>),
    /// Kill every running stage; their outputs must not be published.
    CancelRunning,
    /// Nothing is running and nothing is left to dispatch.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Record a finished stage in the scheduler and the report.
///
/// Returns the store error if the stage hit one, so the caller can abort.
pub fn handle_stage_finished(
    scheduler: &mut Scheduler,
    report: &mut RunReport,
    stage: &str,
    result: StageResult,
) -> Option<CacheStoreError> {
    let (outcome, fatal) = match result {
        StageResult::Built {
            artifacts,
            duration,
        } => {
            report.record(
                stage,
                StageStatus::Built {
                    key: artifacts.key.clone(),
                    duration,
                },
            );
            (StageOutcome::Succeeded(artifacts), None)
        }
        StageResult::CacheHit(artifacts) => {
            report.record(
                stage,
                StageStatus::CacheHit {
                    key: artifacts.key.clone(),
                },
            );
            (StageOutcome::Succeeded(artifacts), None)
        }
        StageResult::Failed(error) => {
            if error.cancelled {
                warn!(stage = %stage, "stage cancelled");
                report.record(stage, StageStatus::Cancelled { error });
            } else {
                warn!(stage = %stage, error = %error, "stage failed");
                report.record(stage, StageStatus::Failed { error });
            }
            (StageOutcome::Failed, None)
        }
        StageResult::StoreFailed(e) => {
            error!(stage = %stage, error = %e, "artifact store failure; aborting run");
            report.record(
                stage,
                StageStatus::Failed {
                    error: StageError::not_run(stage, format!("artifact store failure: {e}")),
                },
            );
            (StageOutcome::Failed, Some(e))
        }
    };

    let step = scheduler.complete(stage, outcome);
    for (blocked, upstream) in step.newly_blocked {
        report.record(&blocked, StageStatus::Blocked { upstream });
    }
    if step.run_just_finished {
        info!("all stages in the run are terminal");
    }

    fatal
}

/// Hand out as many ready stages as the free worker slots allow.
pub fn dispatch_ready(scheduler: &mut Scheduler, free_slots: usize) -> Option<CoreCommand> {
    let ready = scheduler.next_ready(free_slots);
    if ready.is_empty() {
        None
    } else {
        Some(CoreCommand::DispatchStages(ready))
    }
}
