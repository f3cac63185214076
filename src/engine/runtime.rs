// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledStage;
use crate::errors::{Result, ScopebuildError};
use crate::exec::ExecutorBackend;
use crate::report::RunReport;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the stage scheduler in response to `RuntimeEvent`s,
/// and delegates actual stage execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// Runs until every stage in the run is terminal and nothing is in
    /// flight. A store failure aborts the run and is returned as an error
    /// once the running stages have been cancelled and have reported back.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("scopebuild runtime started");

        let step = self.core.start();
        let mut keep_running = step.keep_running;
        for command in step.commands {
            self.execute_command(command).await?;
        }

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    warn!(
                        in_flight = self.core.in_flight(),
                        "runtime event channel closed with stages in flight; exiting"
                    );
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }
            keep_running = step.keep_running;
        }

        info!("runtime exiting");
        self.core.finish().map_err(ScopebuildError::from)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchStages(stages) => {
                self.spawn_ready(stages).await?;
            }
            CoreCommand::CancelRunning => {
                info!("cancelling running stages");
                self.executor.cancel_all();
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, stages: Vec<ScheduledStage>) -> Result<()> {
        if stages.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = stages.iter().map(|s| s.stage.name()).collect();
        debug!(?names, "spawning ready stages");

        self.executor.spawn_ready_stages(stages).await
    }
}
