// tests/executor_cache.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, PackageBuilder};
use crate::common::{init_tracing, mock_tree, with_timeout, workspace_fs};

use std::sync::Arc;
use std::time::Duration;

use scopebuild::dag::{Stage, StageGraph};
use scopebuild::exec::{CancelHandle, CancelSignal, ExecError, ExecOutcome, StageExecutor};
use scopebuild::fs::MockFileSystem;
use scopebuild::store::{ArtifactSet, MemoryArtifactStore};
use scopebuild_test_utils::fake_toolchain::FakeToolchain;

struct Harness {
    fs: MockFileSystem,
    store: Arc<MemoryArtifactStore>,
    toolchain: FakeToolchain,
    executor: StageExecutor,
    graph: StageGraph,
    _staging: tempfile::TempDir,
}

impl Harness {
    fn new(toolchain: FakeToolchain) -> Self {
        init_tracing();
        let fs = workspace_fs();
        let tree = Arc::new(mock_tree(&fs));
        let store = Arc::new(MemoryArtifactStore::new());
        let staging = tempfile::tempdir().unwrap();
        let executor = StageExecutor::new(tree, store.clone(), Arc::new(toolchain.clone()))
            .with_staging_dir(staging.path());
        let cfg = ConfigFileBuilder::new()
            .with_package("app", PackageBuilder::new("pkgA").module("lib").build())
            .with_package("tool", PackageBuilder::new("pkgB").build())
            .build();
        Self {
            fs,
            store,
            toolchain,
            executor,
            graph: StageGraph::from_config(&cfg).unwrap(),
            _staging: staging,
        }
    }

    fn stage(&self, name: &str) -> Stage {
        self.graph.stage(name).unwrap().clone()
    }

    async fn run(&self, name: &str, upstream: Option<&ArtifactSet>) -> Result<ExecOutcome, ExecError> {
        self.executor
            .execute(&self.stage(name), upstream, CancelSignal::never())
            .await
    }
}

#[tokio::test]
async fn second_run_is_a_cache_hit() {
    let h = Harness::new(FakeToolchain::new());

    let first = h.run("deps", None).await.unwrap();
    assert!(matches!(first, ExecOutcome::Built { .. }));
    let second = h.run("deps", None).await.unwrap();
    assert!(matches!(second, ExecOutcome::CacheHit(_)));

    assert_eq!(first.artifacts(), second.artifacts());
    assert_eq!(h.toolchain.invocation_count("deps"), 1);
    assert_eq!(h.store.publish_count(), 1);
    assert!(first.artifacts().files.contains_key("deps.out"));
}

#[tokio::test]
async fn source_edits_keep_the_deps_cache() {
    let h = Harness::new(FakeToolchain::new());
    let deps = h.run("deps", None).await.unwrap().into_artifacts();
    let build = h.run("build", Some(&deps)).await.unwrap().into_artifacts();

    h.fs.add_file("pkgA/src/main.rs", "fn main() { println!(\"edited\"); }\n");

    let deps_again = h.run("deps", None).await.unwrap();
    assert!(matches!(deps_again, ExecOutcome::CacheHit(_)));
    assert_eq!(deps_again.artifacts().key, deps.key);

    let build_again = h.run("build", Some(&deps)).await.unwrap();
    assert!(matches!(build_again, ExecOutcome::Built { .. }));
    assert_ne!(build_again.artifacts().key, build.key);
}

#[tokio::test]
async fn manifest_edits_invalidate_deps() {
    let h = Harness::new(FakeToolchain::new());
    let before = h.run("deps", None).await.unwrap().into_artifacts();

    h.fs.add_file("lib/Cargo.toml", "[package]\nname = \"lib\"\nversion = \"0.2.0\"\n");

    let after = h.run("deps", None).await.unwrap();
    assert!(matches!(after, ExecOutcome::Built { .. }));
    assert_ne!(after.artifacts().key, before.key);
}

#[tokio::test]
async fn package_build_ignores_unrelated_siblings() {
    let h = Harness::new(FakeToolchain::new());
    let deps = h.run("deps", None).await.unwrap().into_artifacts();
    let app = h.run("app", Some(&deps)).await.unwrap().into_artifacts();

    h.fs.add_file("pkgB/src/main.rs", "fn main() { /* sibling edit */ }\n");
    h.fs.add_file("pkgB/src/deep/file.rs", "pub fn deeper() {}\n");
    h.fs.add_file("README.md", "changed\n");

    let again = h.run("app", Some(&deps)).await.unwrap();
    assert!(matches!(again, ExecOutcome::CacheHit(_)));
    assert_eq!(again.artifacts().key, app.key);

    // A declared module is part of the scope.
    h.fs.add_file("lib/src/lib.rs", "pub fn shared() -> u8 { 1 }\n");
    let rebuilt = h.run("app", Some(&deps)).await.unwrap();
    assert!(matches!(rebuilt, ExecOutcome::Built { .. }));
}

#[tokio::test]
async fn toolchain_sees_only_the_scope() {
    let h = Harness::new(FakeToolchain::new());
    let deps = h.run("deps", None).await.unwrap().into_artifacts();
    h.run("app", Some(&deps)).await.unwrap();

    assert_eq!(
        h.toolchain.inputs_of("app").unwrap(),
        vec![
            "Cargo.lock",
            "Cargo.toml",
            "lib/Cargo.toml",
            "lib/src/lib.rs",
            "pkgA/Cargo.toml",
            "pkgA/src/main.rs",
            "pkgB/Cargo.toml",
        ]
    );

    let request = h
        .toolchain
        .requests()
        .into_iter()
        .find(|r| r.stage == "app")
        .unwrap();
    assert_eq!(request.upstream_artifacts, Some(deps.location.clone()));
    assert!(request.source_root.ends_with("src"));
}

#[tokio::test]
async fn failed_invocations_are_not_published() {
    let h = Harness::new(FakeToolchain::new().fail_stage("deps", 101));

    let err = h.run("deps", None).await.unwrap_err();
    match err {
        ExecError::Stage(e) => {
            assert_eq!(e.stage, "deps");
            assert_eq!(e.exit_code, Some(101));
            assert!(!e.cancelled);
            assert_eq!(e.diagnostics, vec!["deps: exit 101"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.store.is_empty());

    // Nothing cached: the next attempt invokes the toolchain again.
    h.run("deps", None).await.unwrap_err();
    assert_eq!(h.toolchain.invocation_count("deps"), 2);
}

#[tokio::test]
async fn upstream_key_feeds_the_downstream_key() {
    let h = Harness::new(FakeToolchain::new());
    let deps = h.run("deps", None).await.unwrap().into_artifacts();
    let (_, with_deps) = h.executor.prepare(&h.stage("build"), Some(&deps)).unwrap();
    let (_, without) = h.executor.prepare(&h.stage("build"), None).unwrap();
    assert_ne!(with_deps, without);
}

#[tokio::test]
async fn siblings_with_identical_inputs_get_distinct_keys() {
    let h = Harness::new(FakeToolchain::new());
    let deps = h.run("deps", None).await.unwrap().into_artifacts();
    let build = h.run("build", Some(&deps)).await.unwrap().into_artifacts();

    let test = h.run("test", Some(&build)).await.unwrap().into_artifacts();
    let doc = h.run("doc", Some(&build)).await.unwrap().into_artifacts();
    assert_ne!(test.key, doc.key);
    assert_eq!(h.toolchain.invocation_count("doc"), 1);
}

#[tokio::test]
async fn force_bypasses_lookup() {
    let h = Harness::new(FakeToolchain::new());
    h.run("deps", None).await.unwrap();

    let forced = h.executor.clone().with_force(true);
    let outcome = forced
        .execute(&h.stage("deps"), None, CancelSignal::never())
        .await
        .unwrap();
    assert!(matches!(outcome, ExecOutcome::Built { .. }));
    assert_eq!(h.toolchain.invocation_count("deps"), 2);
    // The key was already published; the store keeps the first set.
    assert_eq!(h.store.publish_count(), 1);
}

#[tokio::test]
async fn cancellation_discards_outputs() {
    let h = Harness::new(FakeToolchain::new().with_delay(Duration::from_secs(30)));
    let cancel = CancelHandle::new();

    let signal = cancel.signal();
    let stage = h.stage("deps");
    let run = h.executor.execute(&stage, None, signal);
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    };

    let (result, ()) = with_timeout(async { tokio::join!(run, canceller) }).await;
    match result.unwrap_err() {
        ExecError::Stage(e) => assert!(e.cancelled),
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn source_changes_between_snapshot_and_materialize_fail_the_stage() {
    let h = Harness::new(FakeToolchain::new());
    let stage = h.stage("deps");
    let (snapshot, _) = h.executor.prepare(&stage, None).unwrap();

    h.fs.add_file("Cargo.lock", "# changed underneath\n");

    let dest = tempfile::tempdir().unwrap();
    let err = scopebuild::exec::materialize::materialize(h.executor.tree(), &snapshot, dest.path())
        .unwrap_err();
    assert!(matches!(err, scopebuild::errors::FilterError::Changed(_)));
}
