// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `RealExecutorBackend` runs each stage through a [`StageExecutor`] on
//!   its own Tokio task and reports back with `StageFinished`.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which stages were scheduled and directly emits `StageFinished` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dag::ScheduledStage;
use crate::engine::{RuntimeEvent, StageResult};
use crate::errors::Result;
use crate::exec::cancel::CancelHandle;
use crate::exec::executor::StageExecutor;

/// Trait abstracting how scheduled stages are executed.
pub trait ExecutorBackend: Send {
    /// Start the given stages. Each must eventually produce exactly one
    /// `RuntimeEvent::StageFinished`.
    fn spawn_ready_stages(
        &mut self,
        stages: Vec<ScheduledStage>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Cancel every running stage. Cancelled stages still report back.
    fn cancel_all(&mut self);
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    executor: StageExecutor,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel: CancelHandle,
}

impl RealExecutorBackend {
    pub fn new(executor: StageExecutor, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            executor,
            runtime_tx,
            cancel: CancelHandle::new(),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_stages(
        &mut self,
        stages: Vec<ScheduledStage>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for scheduled in stages {
                let executor = self.executor.clone();
                let tx = self.runtime_tx.clone();
                let signal = self.cancel.signal();

                tokio::spawn(async move {
                    let name = scheduled.stage.name().to_string();
                    debug!(stage = %name, "stage task started");
                    let result = executor
                        .execute(&scheduled.stage, scheduled.upstream_artifacts.as_ref(), signal)
                        .await;
                    let event = RuntimeEvent::StageFinished {
                        stage: name.clone(),
                        result: StageResult::from(result),
                    };
                    if tx.send(event).await.is_err() {
                        warn!(stage = %name, "runtime gone; dropping stage result");
                    }
                });
            }
            Ok(())
        })
    }

    fn cancel_all(&mut self) {
        self.cancel.cancel();
    }
}
