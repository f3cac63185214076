use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use scopebuild::dag::ScheduledStage;
use scopebuild::engine::{RuntimeEvent, StageResult};
use scopebuild::errors::{Result, StageError};
use scopebuild::exec::ExecutorBackend;
use scopebuild::store::{ArtifactSet, CacheKey};

/// A fake executor backend that:
/// - records which stages were dispatched, and the upstream key each got
/// - immediately reports `Built` for each stage, or `Failed` for stages
///   marked as failing
/// - holds "hanging" stages until `cancel_all`, then reports them cancelled
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    upstream_keys: Arc<Mutex<BTreeMap<String, Option<String>>>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    held: Vec<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            upstream_keys: Arc::new(Mutex::new(BTreeMap::new())),
            failing: HashSet::new(),
            hanging: HashSet::new(),
            held: Vec::new(),
        }
    }

    pub fn failing(mut self, stage: &str) -> Self {
        self.failing.insert(stage.to_string());
        self
    }

    pub fn hanging(mut self, stage: &str) -> Self {
        self.hanging.insert(stage.to_string());
        self
    }

    /// Stage -> key of the upstream artifact set it was dispatched with.
    pub fn upstream_keys(&self) -> Arc<Mutex<BTreeMap<String, Option<String>>>> {
        Arc::clone(&self.upstream_keys)
    }
}

/// The artifact set the fake reports for `stage`.
pub fn fake_artifacts(stage: &str) -> ArtifactSet {
    ArtifactSet {
        key: CacheKey::from_hex(format!("{stage}-key")),
        location: PathBuf::from(format!("fake/{stage}")),
        files: BTreeMap::new(),
        digest: String::new(),
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_stages(
        &mut self,
        stages: Vec<ScheduledStage>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for s in stages {
                let name = s.stage.name().to_string();
                self.executed.lock().unwrap().push(name.clone());
                self.upstream_keys.lock().unwrap().insert(
                    name.clone(),
                    s.upstream_artifacts.map(|a| a.key.as_str().to_string()),
                );

                if self.hanging.contains(&name) {
                    self.held.push(name);
                    continue;
                }

                let result = if self.failing.contains(&name) {
                    StageResult::Failed(StageError::exited(&name, 1, vec!["boom".to_string()]))
                } else {
                    StageResult::Built {
                        artifacts: fake_artifacts(&name),
                        duration: Duration::from_millis(1),
                    }
                };

                self.runtime_tx
                    .send(RuntimeEvent::StageFinished {
                        stage: name,
                        result,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn cancel_all(&mut self) {
        for name in self.held.drain(..) {
            let tx = self.runtime_tx.clone();
            tokio::spawn(async move {
                let _ = tx
                    .send(RuntimeEvent::StageFinished {
                        stage: name.clone(),
                        result: StageResult::Failed(StageError::cancelled(&name, "cancelled")),
                    })
                    .await;
            });
        }
    }
}
