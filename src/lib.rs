// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod fs;
pub mod logging;
pub mod report;
pub mod scope;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::{Scheduler, StageGraph, StageName};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::exec::{ProcessToolchain, RealExecutorBackend, StageExecutor};
use crate::filter::SourceTree;
use crate::fs::RealFileSystem;
use crate::store::FsArtifactStore;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading and validation
/// - the stage graph, scheduler and runtime
/// - the source tree, artifact store and process toolchain
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_config(&args.config)?.with_overrides(args.jobs, args.store.clone())?;
    let root = workspace_root(&args);
    let graph = StageGraph::from_config(&cfg)?;
    debug!(root = ?root, stages = graph.len(), "configuration loaded");

    match &args.command {
        Command::Plan => {
            print!("{}", render_plan(&cfg, &graph));
            Ok(0)
        }
        Command::Scope { stage } => {
            let tree = open_tree(&root, &cfg)?;
            print_scope(&graph, &tree, stage)?;
            Ok(0)
        }
        Command::Run { tasks } => {
            let tree = Arc::new(open_tree(&root, &cfg)?);
            let store_dir = store_dir(&root, &cfg);
            let store = Arc::new(FsArtifactStore::open(&store_dir)?);
            let executor = StageExecutor::new(tree, store, Arc::new(ProcessToolchain::new()))
                .with_force(args.force)
                .with_staging_dir(store_dir.join("staging"));

            let (runtime, tx) = build_runtime(graph, executor, cfg.config().jobs, tasks)?;

            // Ctrl-C → graceful shutdown.
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });

            let report = runtime.run().await?;
            print!("{}", report.render());
            Ok(report.exit_code())
        }
    }
}

/// Resolve `tasks` against `graph` and assemble a runtime ready to `run()`.
///
/// The returned sender can be used to inject `ShutdownRequested`.
pub fn build_runtime<S: AsRef<str>>(
    graph: StageGraph,
    executor: StageExecutor,
    jobs: usize,
    tasks: &[S],
) -> errors::Result<(Runtime<RealExecutorBackend>, mpsc::Sender<RuntimeEvent>)> {
    let mut requested: Vec<StageName> = Vec::new();
    for task in tasks {
        for stage in graph.resolve_task(task.as_ref())? {
            if !requested.contains(&stage) {
                requested.push(stage);
            }
        }
    }
    info!(?requested, "resolved tasks");

    let mut scheduler = Scheduler::new(graph);
    scheduler.request(&requested)?;

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let backend = RealExecutorBackend::new(executor, tx.clone());
    let core = CoreRuntime::new(scheduler, jobs, &requested);
    Ok((Runtime::new(core, rx, backend), tx))
}

/// Load and validate the config file. A missing file at the default path
/// yields the builtin configuration.
fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() && path == default_config_path() {
        info!(path = ?path, "no config file; using builtin stages only");
        return Ok(ConfigFile::try_from(RawConfigFile::default())?);
    }
    load_and_validate(path).with_context(|| format!("loading config {:?}", path))
}

/// `--root`, else the config file's directory, else the current directory.
fn workspace_root(args: &CliArgs) -> PathBuf {
    if let Some(root) = &args.root {
        return root.clone();
    }
    match args.config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn store_dir(root: &Path, cfg: &ConfigFile) -> PathBuf {
    let store = Path::new(&cfg.config().store);
    if store.is_absolute() {
        store.to_path_buf()
    } else {
        root.join(store)
    }
}

/// Open the workspace tree, ignoring the configured paths and the store
/// itself when it lives inside the workspace.
fn open_tree(root: &Path, cfg: &ConfigFile) -> Result<SourceTree> {
    let mut ignored = cfg.config().ignore.clone();
    let store = store_dir(root, cfg);
    if let Ok(rel) = store.strip_prefix(root) {
        let rel = rel.to_string_lossy().replace('\\', "/");
        if !rel.is_empty() {
            ignored.push(rel);
        }
    }
    let tree = SourceTree::open(Arc::new(RealFileSystem), root)?.with_ignored(ignored);
    Ok(tree)
}

/// Dry-run output: stages, upstreams, scopes and commands.
pub fn render_plan(cfg: &ConfigFile, graph: &StageGraph) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "scopebuild plan");
    let _ = writeln!(out, "  config.jobs = {}", cfg.config().jobs);
    let _ = writeln!(out, "  config.store = {}", cfg.config().store);
    let _ = writeln!(out);
    let _ = writeln!(out, "stages ({}):", graph.len());
    for stage in graph.stages() {
        let _ = writeln!(out, "  - {}", stage.name());
        if let Some(upstream) = stage.upstream() {
            let _ = writeln!(out, "      upstream: {upstream}");
        }
        let _ = writeln!(out, "      scope: {}", stage.scope());
        let _ = writeln!(out, "      cmd: {}", stage.command());
        if let Some(timeout) = stage.timeout() {
            let _ = writeln!(out, "      timeout: {}s", timeout.as_secs());
        }
    }
    out
}

fn print_scope(graph: &StageGraph, tree: &SourceTree, task: &str) -> Result<()> {
    let names = graph.resolve_task(task)?;
    for name in names {
        let Some(stage) = graph.stage(&name) else {
            continue;
        };
        let snapshot = stage.scope().snapshot(tree)?;
        println!("{} [{}]", stage.name(), stage.scope());
        for (path, hash) in &snapshot.files {
            println!("  {}  {}", &hash[..hash.len().min(12)], path);
        }
        println!("  digest: {}", snapshot.digest);
    }
    Ok(())
}
