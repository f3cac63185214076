// src/engine/mod.rs

//! Orchestration engine for scopebuild.
//!
//! This module ties together:
//! - the stage scheduler
//! - the worker cap
//! - the main runtime event loop that reacts to:
//!   - stage completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::dag::StageName;
use crate::errors::{CacheStoreError, StageError};
use crate::exec::{ExecError, ExecOutcome};
use crate::store::ArtifactSet;

/// What happened to one dispatched stage.
#[derive(Debug)]
pub enum StageResult {
    Built {
        artifacts: ArtifactSet,
        duration: Duration,
    },
    CacheHit(ArtifactSet),
    Failed(StageError),
    /// The store could not be read or written; fatal for the run.
    StoreFailed(CacheStoreError),
}

impl From<Result<ExecOutcome, ExecError>> for StageResult {
    fn from(result: Result<ExecOutcome, ExecError>) -> Self {
        match result {
            Ok(ExecOutcome::Built {
                artifacts,
                duration,
            }) => StageResult::Built {
                artifacts,
                duration,
            },
            Ok(ExecOutcome::CacheHit(artifacts)) => StageResult::CacheHit(artifacts),
            Err(ExecError::Stage(e)) => StageResult::Failed(e),
            Err(ExecError::Store(e)) => StageResult::StoreFailed(e),
        }
    }
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A dispatched stage finished, one way or another.
    StageFinished { stage: StageName, result: StageResult },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
