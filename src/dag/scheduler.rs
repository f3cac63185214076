// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::StageGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::stage::StageName;
use crate::dag::stage_info::{RunState, ScheduledStage, StageInfo, StageRunState};
use crate::dag::state_manager::{upstream_satisfied, StateManager};
use crate::errors::ScopebuildError;
use crate::store::ArtifactSet;

/// Outcome of one stage, as reported back to the scheduler.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// Built or served from cache; dependents may now run.
    Succeeded(ArtifactSet),
    /// The stage failed; its pending dependents become `Blocked`.
    Failed,
}

/// Scheduler holds the immutable stage graph plus per-run state.
///
/// It is responsible for:
/// - remembering which stages are part of the current run
/// - handing out stages whose upstream has succeeded
/// - passing the upstream's artifact set to each dispatched stage
/// - blocking dependents of failed stages
///
/// A stage never waits on anything but its single upstream, so siblings are
/// dispatched independently and one sibling's failure never blocks another.
#[derive(Debug)]
pub struct Scheduler {
    graph: StageGraph,
    stages: HashMap<StageName, StageInfo>,
}

impl Scheduler {
    pub fn new(graph: StageGraph) -> Self {
        let stages = graph
            .stages()
            .map(|s| (s.name().to_string(), StageInfo::from_stage(s)))
            .collect();
        Self { graph, stages }
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Add `targets` and their upstream closure to the run.
    ///
    /// Returns the stages that are now part of the run, upstreams first.
    pub fn request<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<Vec<StageName>, ScopebuildError> {
        let closure = self.graph.upstream_closure(targets)?;
        info!(stages = ?closure, "requesting stages");
        let mut manager = StateManager::new(&self.graph, &mut self.stages);
        manager.mark_pending(&closure);
        Ok(closure)
    }

    /// Up to `limit` stages that are ready to run, marked `Running`.
    pub fn next_ready(&mut self, limit: usize) -> Vec<ScheduledStage> {
        let mut manager = StateManager::new(&self.graph, &mut self.stages);
        let ready = manager.collect_ready(limit);
        if !ready.is_empty() {
            debug!(
                stages = ?ready.iter().map(|s| s.stage.name()).collect::<Vec<_>>(),
                "dispatching ready stages"
            );
        }
        ready
    }

    /// Record the outcome of a running stage.
    pub fn complete(&mut self, name: &str, outcome: StageOutcome) -> SchedulerStep {
        let Some(info) = self.stages.get_mut(name) else {
            warn!(stage = %name, "completion for unknown stage; ignoring");
            return SchedulerStep::default();
        };

        if info.run_state != Some(RunState::Running) {
            warn!(
                stage = %name,
                state = ?info.run_state,
                "completion for stage that is not running; ignoring"
            );
            return SchedulerStep::default();
        }

        let newly_blocked = match outcome {
            StageOutcome::Succeeded(artifacts) => {
                debug!(stage = %name, key = %artifacts.key.short(), "stage succeeded");
                info.run_state = Some(RunState::Succeeded);
                info.artifacts = Some(artifacts);
                Vec::new()
            }
            StageOutcome::Failed => {
                info!(stage = %name, "stage failed; blocking dependents");
                info.run_state = Some(RunState::Failed);
                let mut manager = StateManager::new(&self.graph, &mut self.stages);
                manager.mark_dependents_blocked(name)
            }
        };

        SchedulerStep {
            newly_blocked,
            run_just_finished: self.is_finished(),
        }
    }

    /// Mark every stage that has not started as `Skipped`.
    pub fn skip_pending(&mut self) -> Vec<StageName> {
        let mut manager = StateManager::new(&self.graph, &mut self.stages);
        manager.skip_pending()
    }

    /// True when no stage in the run is pending or running.
    pub fn is_finished(&self) -> bool {
        self.stages
            .values()
            .all(|info| info.run_state.is_none_or(|s| s.is_terminal()))
    }

    pub fn has_running(&self) -> bool {
        self.stages
            .values()
            .any(|info| info.run_state == Some(RunState::Running))
    }

    /// Read-only view of the given stage's run state.
    pub fn run_state_of(&self, name: &str) -> Option<StageRunState> {
        let info = self.stages.get(name)?;
        Some(info.run_state.into())
    }

    /// Whether the upstream of `name` has succeeded in this run.
    ///
    /// Returns `None` if the stage is unknown.
    pub fn deps_satisfied(&self, name: &str) -> Option<bool> {
        let info = self.stages.get(name)?;
        Some(upstream_satisfied(&self.stages, info))
    }

    /// The failed upstream that blocked `name`, if it is blocked.
    pub fn blocked_by(&self, name: &str) -> Option<&str> {
        self.stages.get(name)?.blocked_by.as_deref()
    }

    /// Stages participating in this run, in topological order.
    pub fn stages_in_run(&self) -> Vec<StageName> {
        self.graph
            .stages()
            .map(|s| s.name())
            .filter(|name| self.stages.get(*name).is_some_and(|i| i.run_state.is_some()))
            .map(str::to_string)
            .collect()
    }
}
