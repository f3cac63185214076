use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scopebuild::errors::StageError;
use scopebuild::exec::{CancelSignal, Toolchain, ToolchainOutput, ToolchainRequest};

/// A fake toolchain that:
/// - records every request it receives, with the files it was shown
/// - writes `<stage>.out` into the output directory, listing its inputs
/// - exits with a configurable code per stage (0 by default)
/// - optionally sleeps, honouring cancellation while it does
#[derive(Debug, Clone, Default)]
pub struct FakeToolchain {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    requests: Vec<ToolchainRequest>,
    /// Stage -> sorted relative paths found under `source_root`.
    inputs: HashMap<String, Vec<String>>,
    exit_codes: HashMap<String, i32>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    running: usize,
    max_running: usize,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `stage` exit with `code`.
    pub fn fail_stage(self, stage: &str, code: i32) -> Self {
        self.state
            .lock()
            .unwrap()
            .exit_codes
            .insert(stage.to_string(), code);
        self
    }

    /// Make every invocation take at least `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().default_delay = Some(delay);
        self
    }

    /// Make invocations of `stage` take at least `delay`.
    pub fn with_stage_delay(self, stage: &str, delay: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(stage.to_string(), delay);
        self
    }

    /// Stage names in invocation order.
    pub fn invoked(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|r| r.stage.clone())
            .collect()
    }

    pub fn invocation_count(&self, stage: &str) -> usize {
        self.invoked().iter().filter(|s| *s == stage).count()
    }

    pub fn requests(&self) -> Vec<ToolchainRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Files the last invocation of `stage` could see.
    pub fn inputs_of(&self, stage: &str) -> Option<Vec<String>> {
        self.state.lock().unwrap().inputs.get(stage).cloned()
    }

    /// Highest number of invocations that were running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.state.lock().unwrap().max_running
    }

    async fn run(
        &self,
        request: ToolchainRequest,
        mut cancel: CancelSignal,
    ) -> Result<ToolchainOutput, StageError> {
        let stage = request.stage.clone();
        let inputs = list_files(&request.source_root);
        let (delay, exit_code) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.inputs.insert(stage.clone(), inputs.clone());
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            (
                state.delays.get(&stage).copied().or(state.default_delay),
                state.exit_codes.get(&stage).copied().unwrap_or(0),
            )
        };

        let cancelled = match delay {
            Some(delay) => tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = cancel.cancelled() => true,
            },
            None => false,
        };

        self.state.lock().unwrap().running -= 1;

        if cancelled {
            return Err(StageError::cancelled(&stage, "cancelled"));
        }

        let mut listing = format!("stage={stage}\n");
        for path in &inputs {
            listing.push_str(path);
            listing.push('\n');
        }
        std::fs::write(request.out_dir.join(format!("{stage}.out")), listing)
            .map_err(|e| StageError::not_run(&stage, e.to_string()))?;

        Ok(ToolchainOutput {
            exit_code,
            diagnostics: vec![format!("{stage}: exit {exit_code}")],
        })
    }
}

impl Toolchain for FakeToolchain {
    fn invoke(
        &self,
        request: ToolchainRequest,
        cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ToolchainOutput, StageError>> + Send + '_>> {
        Box::pin(self.run(request, cancel))
    }
}

/// Sorted relative paths of every file under `root`.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(rel) = path.strip_prefix(root) {
                let rel = rel.to_string_lossy().replace('\\', "/");
                out.insert(rel, ());
            }
        }
    }
    out.into_keys().collect()
}
