// src/dag/state_manager.rs

//! Per-run state transitions for stages in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::StageGraph;
use crate::dag::stage::StageName;
use crate::dag::stage_info::{RunState, ScheduledStage, StageInfo};

/// Manages per-run state transitions for stages.
pub struct StateManager<'a> {
    graph: &'a StageGraph,
    stages: &'a mut HashMap<StageName, StageInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a StageGraph, stages: &'a mut HashMap<StageName, StageInfo>) -> Self {
        Self { graph, stages }
    }

    /// Mark the given stages `Pending`. Stages already in the run keep their
    /// state.
    pub fn mark_pending(&mut self, names: &[StageName]) {
        for name in names {
            if let Some(info) = self.stages.get_mut(name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(stage = %info.name, "marked Pending for this run");
                }
            } else {
                warn!(stage = %name, "requested stage missing from stage map");
            }
        }
    }

    /// Mark every pending transitive dependent of `failed` as `Blocked`.
    ///
    /// Siblings of `failed` are not dependents and are left untouched.
    pub fn mark_dependents_blocked(&mut self, failed: &str) -> Vec<(StageName, StageName)> {
        let mut stack: Vec<StageName> = self
            .graph
            .dependents_of(failed)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.stages.get_mut(&name) else {
                continue;
            };
            if info.run_state == Some(RunState::Pending) {
                info.run_state = Some(RunState::Blocked);
                info.blocked_by = Some(failed.to_string());
                info!(stage = %info.name, upstream = %failed, "blocked by upstream failure");
                newly_blocked.push((info.name.clone(), failed.to_string()));
                stack.extend(self.graph.dependents_of(&name).into_iter().map(str::to_string));
            }
        }

        newly_blocked
    }

    /// Move up to `limit` dependency-satisfied `Pending` stages to `Running`.
    ///
    /// Candidates are taken in topological order so the dispatch sequence is
    /// deterministic for a given graph.
    pub fn collect_ready(&mut self, limit: usize) -> Vec<ScheduledStage> {
        let mut ready = Vec::new();
        if limit == 0 {
            return ready;
        }

        let candidates: Vec<StageName> = self
            .graph
            .stages()
            .map(|s| s.name().to_string())
            .filter(|name| {
                self.stages.get(name).is_some_and(|info| {
                    info.run_state == Some(RunState::Pending)
                        && upstream_satisfied(&*self.stages, info)
                })
            })
            .take(limit)
            .collect();

        for name in candidates {
            let upstream_artifacts = self
                .stages
                .get(&name)
                .and_then(|info| info.upstream.as_ref())
                .and_then(|up| self.stages.get(up))
                .and_then(|up| up.artifacts.clone());

            let (Some(info), Some(stage)) = (self.stages.get_mut(&name), self.graph.stage(&name))
            else {
                continue;
            };
            info.run_state = Some(RunState::Running);
            debug!(stage = %info.name, "upstream satisfied; marking Running");
            ready.push(ScheduledStage {
                stage: stage.clone(),
                upstream_artifacts,
            });
        }

        ready
    }

    /// Mark every still-pending stage `Skipped`.
    pub fn skip_pending(&mut self) -> Vec<StageName> {
        let mut skipped: Vec<StageName> = self
            .stages
            .values_mut()
            .filter(|info| info.run_state == Some(RunState::Pending))
            .map(|info| {
                info.run_state = Some(RunState::Skipped);
                info.name.clone()
            })
            .collect();
        skipped.sort();
        skipped
    }
}

/// Whether the upstream of `info` has succeeded in this run.
///
/// A stage without an upstream is always satisfied.
pub fn upstream_satisfied(stages: &HashMap<StageName, StageInfo>, info: &StageInfo) -> bool {
    match &info.upstream {
        None => true,
        Some(up) => match stages.get(up) {
            Some(dep) => dep.run_state == Some(RunState::Succeeded) && dep.artifacts.is_some(),
            None => {
                warn!(stage = %info.name, upstream = %up, "upstream missing from stage map");
                false
            }
        },
    }
}
