// src/report.rs

//! Per-run summary of what happened to every stage.

use std::fmt::Write as _;
use std::time::Duration;

use crate::dag::StageName;
use crate::errors::StageError;
use crate::store::CacheKey;

/// Final status of one stage in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// The toolchain ran and its outputs were published.
    Built { key: CacheKey, duration: Duration },
    /// The artifact set was already in the store.
    CacheHit { key: CacheKey },
    Failed { error: StageError },
    /// Not started because `upstream` failed.
    Blocked { upstream: StageName },
    /// Killed by shutdown or timeout while running.
    Cancelled { error: StageError },
    /// Never dispatched (shutdown before it became ready).
    NotStarted,
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Built { .. } | StageStatus::CacheHit { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            StageStatus::Built { .. } => "built",
            StageStatus::CacheHit { .. } => "cached",
            StageStatus::Failed { .. } => "FAILED",
            StageStatus::Blocked { .. } => "blocked",
            StageStatus::Cancelled { .. } => "cancelled",
            StageStatus::NotStarted => "not started",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: StageName,
    /// Whether the stage was named on the command line, as opposed to being
    /// pulled in as an upstream.
    pub requested: bool,
    pub status: StageStatus,
}

/// Outcome of one invocation, one entry per stage in the run, upstreams first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    stages: Vec<StageReport>,
}

impl RunReport {
    /// Every stage in `in_run` starts as `NotStarted`.
    pub fn new(in_run: &[StageName], requested: &[StageName]) -> Self {
        let stages = in_run
            .iter()
            .map(|name| StageReport {
                stage: name.clone(),
                requested: requested.contains(name),
                status: StageStatus::NotStarted,
            })
            .collect();
        Self { stages }
    }

    pub fn record(&mut self, stage: &str, status: StageStatus) {
        match self.stages.iter_mut().find(|r| r.stage == stage) {
            Some(report) => report.status = status,
            None => self.stages.push(StageReport {
                stage: stage.to_string(),
                requested: false,
                status,
            }),
        }
    }

    pub fn stages(&self) -> &[StageReport] {
        &self.stages
    }

    pub fn status_of(&self, stage: &str) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// True iff every requested stage succeeded.
    pub fn success(&self) -> bool {
        self.stages
            .iter()
            .filter(|r| r.requested)
            .all(|r| r.status.is_success())
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    pub fn count(&self, pred: impl Fn(&StageStatus) -> bool) -> usize {
        self.stages.iter().filter(|r| pred(&r.status)).count()
    }

    /// Human-readable summary, followed by the diagnostics of every failure.
    pub fn render(&self) -> String {
        let width = self
            .stages
            .iter()
            .map(|r| r.stage.len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "scopebuild: {} stage(s): {} built, {} cached, {} failed, {} blocked",
            self.stages.len(),
            self.count(|s| matches!(s, StageStatus::Built { .. })),
            self.count(|s| matches!(s, StageStatus::CacheHit { .. })),
            self.count(|s| matches!(s, StageStatus::Failed { .. } | StageStatus::Cancelled { .. })),
            self.count(|s| matches!(s, StageStatus::Blocked { .. })),
        );

        for report in &self.stages {
            let detail = match &report.status {
                StageStatus::Built { key, duration } => {
                    format!("{}  {:.2}s", key.short(), duration.as_secs_f64())
                }
                StageStatus::CacheHit { key } => key.short().to_string(),
                StageStatus::Failed { error } | StageStatus::Cancelled { error } => {
                    error.to_string()
                }
                StageStatus::Blocked { upstream } => format!("upstream '{upstream}' failed"),
                StageStatus::NotStarted => String::new(),
            };
            let _ = writeln!(
                out,
                "  {:<width$}  {:<11}  {}",
                report.stage,
                report.status.label(),
                detail,
            );
        }

        for report in &self.stages {
            let error = match &report.status {
                StageStatus::Failed { error } | StageStatus::Cancelled { error } => error,
                _ => continue,
            };
            if error.diagnostics.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n--- {} ---", report.stage);
            for line in &error.diagnostics {
                let _ = writeln!(out, "{line}");
            }
        }

        out
    }
}
