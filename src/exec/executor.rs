// src/exec/executor.rs

//! Cache-aware execution of a single stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use crate::dag::Stage;
use crate::errors::{CacheStoreError, FilterError, StageError};
use crate::exec::cancel::CancelSignal;
use crate::exec::materialize::materialize;
use crate::exec::toolchain::{Toolchain, ToolchainRequest};
use crate::filter::{InputSnapshot, SourceTree};
use crate::store::{ArtifactSet, ArtifactStore, CacheKey};

/// How a stage came to have its artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The key was already published; the toolchain was not invoked.
    CacheHit(ArtifactSet),
    /// The toolchain ran and its outputs were published.
    Built {
        artifacts: ArtifactSet,
        duration: Duration,
    },
}

impl ExecOutcome {
    pub fn artifacts(&self) -> &ArtifactSet {
        match self {
            ExecOutcome::CacheHit(artifacts) => artifacts,
            ExecOutcome::Built { artifacts, .. } => artifacts,
        }
    }

    pub fn into_artifacts(self) -> ArtifactSet {
        match self {
            ExecOutcome::CacheHit(artifacts) => artifacts,
            ExecOutcome::Built { artifacts, .. } => artifacts,
        }
    }
}

/// Failure of one execution. `Stage` is local to the stage, `Store` is fatal
/// for the whole invocation.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Store(#[from] CacheStoreError),
}

/// Runs stages against one source tree and one artifact store.
#[derive(Debug, Clone)]
pub struct StageExecutor {
    tree: Arc<SourceTree>,
    store: Arc<dyn ArtifactStore>,
    toolchain: Arc<dyn Toolchain>,
    force: bool,
    staging_dir: Option<PathBuf>,
}

impl StageExecutor {
    pub fn new(
        tree: Arc<SourceTree>,
        store: Arc<dyn ArtifactStore>,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        Self {
            tree,
            store,
            toolchain,
            force: false,
            staging_dir: None,
        }
    }

    /// Skip cache lookups. Results are still published.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Create per-stage staging directories under `dir` instead of the
    /// system temp directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn tree(&self) -> &SourceTree {
        &self.tree
    }

    /// Snapshot the stage's scope and derive its cache key.
    pub fn prepare(
        &self,
        stage: &Stage,
        upstream: Option<&ArtifactSet>,
    ) -> Result<(InputSnapshot, CacheKey), FilterError> {
        let snapshot = stage.scope().snapshot(&self.tree)?;
        let key = CacheKey::derive(
            stage.name(),
            stage.command(),
            &snapshot.digest,
            upstream.map(|a| &a.key),
        );
        Ok((snapshot, key))
    }

    /// Execute `stage`, consulting the store first.
    ///
    /// A stage whose key is already published is a cache hit and the
    /// toolchain is not invoked. Otherwise the snapshot is materialized into
    /// a private staging directory, the toolchain runs there, and its output
    /// directory is published only if it exits 0. Nothing is published for a
    /// failed, timed-out or cancelled invocation.
    pub async fn execute(
        &self,
        stage: &Stage,
        upstream: Option<&ArtifactSet>,
        cancel: CancelSignal,
    ) -> Result<ExecOutcome, ExecError> {
        let started = Instant::now();
        let name = stage.name().to_string();

        let (snapshot, key) = {
            let this = self.clone();
            let stage = stage.clone();
            let upstream = upstream.cloned();
            spawn_blocking(move || this.prepare(&stage, upstream.as_ref()))
                .await
                .map_err(|e| StageError::not_run(&name, format!("snapshot task failed: {e}")))?
                .map_err(|e| StageError::not_run(&name, format!("capturing inputs: {e}")))?
        };
        debug!(
            stage = %name,
            key = %key.short(),
            files = snapshot.files.len(),
            "derived cache key"
        );

        if !self.force {
            let store = self.store.clone();
            let lookup_key = key.clone();
            let hit = spawn_blocking(move || store.lookup(&lookup_key))
                .await
                .map_err(|e| join_error(self.staging_root(), e))??;
            if let Some(artifacts) = hit {
                info!(stage = %name, key = %key.short(), "cache hit");
                return Ok(ExecOutcome::CacheHit(artifacts));
            }
        }

        let staging = self.staging(&name).map_err(ExecError::Store)?;
        let source_root = staging.path().join("src");
        let out_dir = staging.path().join("out");
        std::fs::create_dir_all(&out_dir).map_err(|e| CacheStoreError::io(&out_dir, e))?;

        {
            let tree = self.tree.clone();
            let snapshot = snapshot.clone();
            let dest = source_root.clone();
            spawn_blocking(move || {
                std::fs::create_dir_all(&dest).map_err(|e| FilterError::Io {
                    path: dest.clone(),
                    cause: e.into(),
                })?;
                materialize(&tree, &snapshot, &dest)
            })
            .await
            .map_err(|e| StageError::not_run(&name, format!("materialize task failed: {e}")))?
            .map_err(|e| StageError::not_run(&name, format!("materializing inputs: {e}")))?;
        }

        let request = ToolchainRequest {
            stage: name.clone(),
            command: stage.command().clone(),
            source_root,
            out_dir: out_dir.clone(),
            upstream_artifacts: upstream.map(|a| a.location.clone()),
            timeout: stage.timeout(),
        };

        info!(stage = %name, key = %key.short(), "cache miss; invoking toolchain");
        let output = self.toolchain.invoke(request, cancel).await?;
        if !output.success() {
            return Err(StageError::exited(&name, output.exit_code, output.diagnostics).into());
        }

        let store = self.store.clone();
        let publish_key = key.clone();
        let artifacts = spawn_blocking(move || store.publish(&publish_key, &out_dir))
            .await
            .map_err(|e| join_error(self.staging_root(), e))??;

        let duration = started.elapsed();
        info!(
            stage = %name,
            key = %key.short(),
            files = artifacts.files.len(),
            elapsed_ms = duration.as_millis() as u64,
            "stage built and published"
        );
        Ok(ExecOutcome::Built {
            artifacts,
            duration,
        })
    }

    fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    fn staging(&self, stage: &str) -> Result<tempfile::TempDir, CacheStoreError> {
        let root = self.staging_root();
        std::fs::create_dir_all(&root).map_err(|e| CacheStoreError::io(&root, e))?;
        tempfile::Builder::new()
            .prefix(&format!("scopebuild-{}-", sanitize(stage)))
            .tempdir_in(&root)
            .map_err(|e| CacheStoreError::io(&root, e))
    }
}

fn sanitize(stage: &str) -> String {
    stage
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn join_error(path: impl AsRef<Path>, e: tokio::task::JoinError) -> CacheStoreError {
    CacheStoreError::io(path.as_ref(), std::io::Error::from(e))
}
