// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - handing `ScheduledStage`s to the executor backend
//! - cancelling running stages on shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use tracing::{debug, info};

use crate::dag::{Scheduler, StageName};
use crate::engine::event_handlers::{dispatch_ready, handle_stage_finished, CoreCommand, CoreStep};
use crate::engine::RuntimeEvent;
use crate::errors::CacheStoreError;
use crate::report::RunReport;

/// Pure core runtime state.
///
/// This owns:
/// - the stage scheduler, already seeded with the requested stages
/// - the worker cap and the number of stages in flight
/// - the run report
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    jobs: usize,
    in_flight: usize,
    report: RunReport,
    shutting_down: bool,
    fatal: Option<CacheStoreError>,
}

impl CoreRuntime {
    /// `requested` are the stages named by the user; the scheduler must
    /// already have them (and their upstreams) in its run.
    pub fn new(scheduler: Scheduler, jobs: usize, requested: &[StageName]) -> Self {
        let report = RunReport::new(&scheduler.stages_in_run(), requested);
        Self {
            scheduler,
            jobs: jobs.max(1),
            in_flight: 0,
            report,
            shutting_down: false,
            fatal: None,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Consume the core, yielding the report or the fatal store error.
    pub fn finish(self) -> Result<RunReport, CacheStoreError> {
        match self.fatal {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }

    /// Dispatch the initial wave of stages.
    pub fn start(&mut self) -> CoreStep {
        info!(jobs = self.jobs, "starting run");
        let mut commands = Vec::new();
        self.dispatch(&mut commands);
        self.finish_step(commands)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let mut commands = Vec::new();

        match event {
            RuntimeEvent::StageFinished { stage, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if let Some(e) =
                    handle_stage_finished(&mut self.scheduler, &mut self.report, &stage, result)
                {
                    if self.fatal.is_none() {
                        self.fatal = Some(e);
                    }
                    self.begin_shutdown(&mut commands);
                }
                self.dispatch(&mut commands);
            }
            RuntimeEvent::ShutdownRequested => {
                info!(in_flight = self.in_flight, "shutdown requested");
                self.begin_shutdown(&mut commands);
            }
        }

        self.finish_step(commands)
    }

    fn begin_shutdown(&mut self, commands: &mut Vec<CoreCommand>) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        let skipped = self.scheduler.skip_pending();
        debug!(?skipped, "stages will not be started");
        if self.in_flight > 0 {
            commands.push(CoreCommand::CancelRunning);
        }
    }

    fn dispatch(&mut self, commands: &mut Vec<CoreCommand>) {
        if self.shutting_down {
            return;
        }
        let free = self.jobs.saturating_sub(self.in_flight);
        if let Some(cmd) = dispatch_ready(&mut self.scheduler, free) {
            if let CoreCommand::DispatchStages(stages) = &cmd {
                self.in_flight += stages.len();
            }
            commands.push(cmd);
        }
    }

    fn finish_step(&self, mut commands: Vec<CoreCommand>) -> CoreStep {
        let keep_running = self.in_flight > 0;
        if !keep_running {
            commands.push(CoreCommand::RequestExit);
        }
        CoreStep {
            commands,
            keep_running,
        }
    }
}
