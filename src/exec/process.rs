// src/exec/process.rs

//! Toolchain backed by OS processes.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::StageError;
use crate::exec::cancel::CancelSignal;
use crate::exec::toolchain::{Toolchain, ToolchainOutput, ToolchainRequest};
use crate::types::StageCommand;

/// Number of output lines kept as diagnostics.
pub const DEFAULT_DIAGNOSTICS_TAIL: usize = 200;

/// How long output is drained after the child exits.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

pub const ENV_STAGE: &str = "SCOPEBUILD_STAGE";
pub const ENV_SOURCE_ROOT: &str = "SCOPEBUILD_SOURCE_ROOT";
pub const ENV_OUT_DIR: &str = "SCOPEBUILD_OUT_DIR";
pub const ENV_UPSTREAM_ARTIFACTS: &str = "SCOPEBUILD_UPSTREAM_ARTIFACTS";

type Tail = Arc<Mutex<VecDeque<String>>>;

/// Runs stage commands with `tokio::process`.
///
/// Shell commands go through `sh -c`; argv commands are spawned directly.
/// The child is killed on timeout, on cancellation, and when the invocation
/// future is dropped.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    tail_lines: usize,
    drain_grace: Duration,
}

impl ProcessToolchain {
    pub fn new() -> Self {
        Self {
            tail_lines: DEFAULT_DIAGNOSTICS_TAIL,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    /// Bound on draining output once the child has exited.
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    async fn run(
        &self,
        request: ToolchainRequest,
        mut cancel: CancelSignal,
    ) -> Result<ToolchainOutput, StageError> {
        info!(
            stage = %request.stage,
            cmd = %request.command,
            "starting toolchain process"
        );

        let mut cmd = build_command(&request.command)
            .ok_or_else(|| StageError::not_run(&request.stage, "empty command"))?;

        cmd.current_dir(&request.source_root)
            .env(ENV_STAGE, &request.stage)
            .env(ENV_SOURCE_ROOT, &request.source_root)
            .env(ENV_OUT_DIR, &request.out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        match &request.upstream_artifacts {
            Some(dir) => cmd.env(ENV_UPSTREAM_ARTIFACTS, dir),
            None => cmd.env_remove(ENV_UPSTREAM_ARTIFACTS),
        };

        let mut child = cmd.spawn().map_err(|e| {
            StageError::not_run(&request.stage, format!("spawning toolchain: {e}"))
        })?;

        let tail: Tail = Arc::new(Mutex::new(VecDeque::with_capacity(self.tail_lines)));
        let mut readers: Vec<JoinHandle<()>> = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, &request.stage, "stdout", tail.clone(), self.tail_lines));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, &request.stage, "stderr", tail.clone(), self.tail_lines));
        }

        let deadline = async {
            match request.timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let status = tokio::select! {
            status_res = child.wait() => status_res.map_err(|e| {
                StageError::not_run(&request.stage, format!("waiting for toolchain: {e}"))
            })?,

            _ = &mut deadline => {
                warn!(stage = %request.stage, "toolchain timed out; killing process");
                kill(&mut child, &request.stage).await;
                abort_readers(&readers);
                return Err(stopped(&request.stage, "timed out", &tail));
            }

            _ = cancel.cancelled() => {
                info!(stage = %request.stage, "cancellation requested; killing process");
                kill(&mut child, &request.stage).await;
                abort_readers(&readers);
                return Err(stopped(&request.stage, "cancelled", &tail));
            }
        };

        let code = status.code().unwrap_or(-1);
        info!(
            stage = %request.stage,
            exit_code = code,
            success = status.success(),
            "toolchain process exited"
        );

        // Descendants that inherited stdout/stderr keep the pipes open after
        // the child exits. Drain for a bounded time, still honouring the
        // deadline and cancellation.
        let drain = tokio::select! {
            _ = join_readers(&mut readers, &request.stage) => Drain::Complete,
            _ = tokio::time::sleep(self.drain_grace) => Drain::Detached,
            _ = &mut deadline => Drain::TimedOut,
            _ = cancel.cancelled() => Drain::Cancelled,
        };
        abort_readers(&readers);

        match drain {
            Drain::Complete => {}
            Drain::Detached => warn!(
                stage = %request.stage,
                grace_ms = self.drain_grace.as_millis() as u64,
                "output still open after exit; detaching from leftover processes"
            ),
            Drain::TimedOut => {
                warn!(stage = %request.stage, "toolchain timed out while draining output");
                return Err(stopped(&request.stage, "timed out", &tail));
            }
            Drain::Cancelled => {
                info!(stage = %request.stage, "cancellation requested while draining output");
                return Err(stopped(&request.stage, "cancelled", &tail));
            }
        }

        Ok(ToolchainOutput {
            exit_code: code,
            diagnostics: drain_tail(&tail),
        })
    }
}

enum Drain {
    Complete,
    Detached,
    TimedOut,
    Cancelled,
}

impl Default for ProcessToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for ProcessToolchain {
    fn invoke(
        &self,
        request: ToolchainRequest,
        cancel: CancelSignal,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<ToolchainOutput, StageError>> + Send + '_>>
    {
        Box::pin(self.run(request, cancel))
    }
}

fn build_command(command: &StageCommand) -> Option<Command> {
    if command.is_empty() {
        return None;
    }
    match command {
        StageCommand::Shell(line) => {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            Some(c)
        }
        StageCommand::Argv(args) => {
            let (program, rest) = args.split_first()?;
            let mut c = Command::new(program);
            c.args(rest);
            Some(c)
        }
    }
}

fn spawn_reader<R>(
    stream: R,
    stage: &str,
    channel: &'static str,
    tail: Tail,
    limit: usize,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let stage = stage.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(stage = %stage, "{channel}: {line}");
            if limit == 0 {
                continue;
            }
            let mut buf = tail.lock().unwrap_or_else(|e| e.into_inner());
            if buf.len() == limit {
                buf.pop_front();
            }
            buf.push_back(line);
        }
    })
}

async fn join_readers(readers: &mut [JoinHandle<()>], stage: &str) {
    for reader in readers.iter_mut() {
        if let Err(e) = reader.await {
            warn!(stage = %stage, error = %e, "output reader task failed");
        }
    }
}

fn abort_readers(readers: &[JoinHandle<()>]) {
    for reader in readers {
        reader.abort();
    }
}

fn stopped(stage: &str, reason: &str, tail: &Tail) -> StageError {
    let mut err = StageError::cancelled(stage, reason);
    err.diagnostics.extend(drain_tail(tail));
    err
}

fn drain_tail(tail: &Tail) -> Vec<String> {
    let mut buf = tail.lock().unwrap_or_else(|e| e.into_inner());
    buf.drain(..).collect()
}

async fn kill(child: &mut tokio::process::Child, stage: &str) {
    if let Err(e) = child.kill().await {
        warn!(stage = %stage, error = %e, "failed to kill toolchain process");
    }
}
