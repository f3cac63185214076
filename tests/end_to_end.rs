// tests/end_to_end.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, PackageBuilder};
use crate::common::{init_tracing, with_timeout, write_tree, WORKSPACE};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scopebuild::config::model::ConfigFile;
use scopebuild::dag::StageGraph;
use scopebuild::engine::RuntimeEvent;
use scopebuild::exec::StageExecutor;
use scopebuild::filter::SourceTree;
use scopebuild::fs::RealFileSystem;
use scopebuild::report::{RunReport, StageStatus};
use scopebuild::store::FsArtifactStore;
use scopebuild::{build_runtime, render_plan};
use scopebuild_test_utils::fake_toolchain::FakeToolchain;

fn config() -> ConfigFile {
    ConfigFileBuilder::new()
        .jobs(2)
        .with_package("app", PackageBuilder::new("pkgA").module("lib").build())
        .with_package("tool", PackageBuilder::new("pkgB").build())
        .build()
}

async fn run_once(
    workspace: &Path,
    store: &Path,
    toolchain: &FakeToolchain,
    tasks: &[&str],
) -> RunReport {
    let tree = Arc::new(SourceTree::open(Arc::new(RealFileSystem), workspace).unwrap());
    let store = Arc::new(FsArtifactStore::open(store).unwrap());
    let executor = StageExecutor::new(tree, store, Arc::new(toolchain.clone()))
        .with_staging_dir(workspace.parent().unwrap().join("staging"));
    let graph = StageGraph::from_config(&config()).unwrap();

    let (runtime, _tx) = build_runtime(graph, executor, 2, tasks).unwrap();
    with_timeout(runtime.run()).await.unwrap()
}

fn status<'a>(report: &'a RunReport, stage: &str) -> &'a StageStatus {
    report.status_of(stage).unwrap()
}

fn is_built(s: &StageStatus) -> bool {
    matches!(s, StageStatus::Built { .. })
}

fn is_cached(s: &StageStatus) -> bool {
    matches!(s, StageStatus::CacheHit { .. })
}

#[tokio::test]
async fn rerun_of_an_unchanged_workspace_is_fully_cached() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new();

    let first = run_once(&ws, &store, &toolchain, &["all"]).await;
    assert!(first.success());
    assert_eq!(first.count(is_built), 7);
    assert_eq!(toolchain.invoked().len(), 7);

    let second = run_once(&ws, &store, &toolchain, &["all"]).await;
    assert!(second.success());
    assert_eq!(second.count(is_cached), 7);
    assert_eq!(toolchain.invoked().len(), 7);
    assert_eq!(second.exit_code(), 0);
}

#[tokio::test]
async fn editing_one_package_rebuilds_only_what_it_feeds() {
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new();

    run_once(&ws, &store, &toolchain, &["all"]).await;

    std::fs::write(ws.join("pkgB/src/main.rs"), "fn main() { println!(\"B2\"); }\n").unwrap();
    let report = run_once(&ws, &store, &toolchain, &["all"]).await;

    assert!(is_cached(status(&report, "deps")));
    assert!(is_cached(status(&report, "app")));
    for stage in ["build", "test", "lint", "doc", "tool"] {
        assert!(is_built(status(&report, stage)), "{stage} should rebuild");
    }
}

#[tokio::test]
async fn editing_a_manifest_invalidates_everything() {
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new();

    run_once(&ws, &store, &toolchain, &["all"]).await;
    std::fs::write(ws.join("Cargo.lock"), "# lock v2\n").unwrap();
    let report = run_once(&ws, &store, &toolchain, &["all"]).await;

    assert_eq!(report.count(is_built), 7);
}

#[tokio::test]
async fn requesting_a_package_runs_only_its_upstream_chain() {
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new();

    let report = run_once(&ws, &store, &toolchain, &["app"]).await;
    let names: Vec<_> = report.stages().iter().map(|r| r.stage.as_str()).collect();
    assert_eq!(names, vec!["deps", "app"]);

    let mut invoked = toolchain.invoked();
    invoked.sort();
    assert_eq!(invoked, vec!["app", "deps"]);

    // The package build saw the published deps outputs.
    let app = toolchain
        .requests()
        .into_iter()
        .find(|r| r.stage == "app")
        .unwrap();
    let upstream = app.upstream_artifacts.unwrap();
    assert!(upstream.join("deps.out").is_file());
}

#[tokio::test]
async fn failure_blocks_dependents_and_sets_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new().fail_stage("build", 1);

    let report = run_once(&ws, &store, &toolchain, &["all"]).await;
    assert!(!report.success());
    assert_eq!(report.exit_code(), 1);

    assert!(matches!(status(&report, "build"), StageStatus::Failed { .. }));
    for stage in ["test", "lint", "doc"] {
        assert_eq!(
            status(&report, stage),
            &StageStatus::Blocked {
                upstream: "build".to_string()
            }
        );
    }
    // Package builds only reuse deps.
    assert!(is_built(status(&report, "app")));
    assert!(is_built(status(&report, "tool")));

    let rendered = report.render();
    assert!(rendered.contains("upstream 'build' failed"));
    assert!(rendered.contains("build: exit 1"));
}

#[tokio::test]
async fn workers_never_exceed_the_job_limit() {
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new().with_delay(Duration::from_millis(30));

    let report = run_once(&ws, &store, &toolchain, &["all"]).await;
    assert!(report.success());
    assert!(toolchain.max_concurrency() <= 2);
}

#[tokio::test]
async fn shutdown_cancels_running_stages() {
    let dir = tempfile::tempdir().unwrap();
    let ws = dir.path().join("ws");
    let store_dir = dir.path().join("store");
    write_tree(&ws, WORKSPACE);
    let toolchain = FakeToolchain::new().with_stage_delay("deps", Duration::from_secs(30));

    let tree = Arc::new(SourceTree::open(Arc::new(RealFileSystem), &ws).unwrap());
    let store = Arc::new(FsArtifactStore::open(&store_dir).unwrap());
    let executor = StageExecutor::new(tree, store.clone(), Arc::new(toolchain.clone()));
    let graph = StageGraph::from_config(&config()).unwrap();
    let (runtime, tx) = build_runtime(graph, executor, 2, &["build"]).unwrap();

    let handle = tokio::spawn(runtime.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    let report = with_timeout(handle).await.unwrap().unwrap();
    assert!(matches!(status(&report, "deps"), StageStatus::Cancelled { .. }));
    assert_eq!(status(&report, "build"), &StageStatus::NotStarted);
    assert_eq!(report.exit_code(), 1);
    // Nothing was published.
    assert_eq!(
        std::fs::read_dir(store_dir.join("artifacts")).unwrap().count(),
        0
    );
}

#[test]
fn plan_lists_every_stage_with_its_scope() {
    let cfg = config();
    let graph = StageGraph::from_config(&cfg).unwrap();
    let plan = render_plan(&cfg, &graph);

    assert!(plan.starts_with("scopebuild plan\n"));
    assert!(plan.contains("config.jobs = 2"));
    assert!(plan.contains("stages (7):"));
    assert!(plan.contains("  - app\n      upstream: deps\n      scope: package:pkgA (shallow"));
    assert!(plan.contains("cmd: cargo fetch --locked"));
}
