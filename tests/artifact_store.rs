// tests/artifact_store.rs

mod common;
use crate::common::{init_tracing, write_tree};

use std::sync::Arc;

use scopebuild::errors::CacheStoreError;
use scopebuild::store::fs_store::MANIFEST_FILE;
use scopebuild::store::{ArtifactStore, CacheKey, FsArtifactStore, MemoryArtifactStore};
use scopebuild::types::StageCommand;

fn key(stage: &str) -> CacheKey {
    CacheKey::derive(stage, &StageCommand::argv(["true"]), "digest", None)
}

#[test]
fn publish_then_lookup_returns_the_same_set() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let staged = tempfile::tempdir().unwrap();
    write_tree(
        staged.path(),
        &[("bin/app", "binary"), ("report.txt", "ok\n")],
    );

    let store = FsArtifactStore::open(root.path().join("store")).unwrap();
    let k = key("build");
    assert!(store.lookup(&k).unwrap().is_none());

    let published = store.publish(&k, staged.path()).unwrap();
    assert_eq!(
        published.files.keys().collect::<Vec<_>>(),
        vec!["bin/app", "report.txt"]
    );
    assert_eq!(
        published.files["report.txt"],
        blake3::hash(b"ok\n").to_hex().to_string()
    );

    let found = store.lookup(&k).unwrap().unwrap();
    assert_eq!(found, published);

    // Sharded by the first two hex characters.
    let hex = k.as_str();
    let set_dir = root
        .path()
        .join("store/artifacts")
        .join(&hex[..2])
        .join(&hex[2..]);
    assert!(set_dir.join(MANIFEST_FILE).is_file());
    assert_eq!(found.location, set_dir.join("files"));
    assert_eq!(
        std::fs::read_to_string(found.location.join("bin/app")).unwrap(),
        "binary"
    );
}

#[test]
fn second_publish_keeps_the_first_set() {
    let root = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(root.path()).unwrap();
    let k = key("doc");

    let first_dir = tempfile::tempdir().unwrap();
    write_tree(first_dir.path(), &[("index.html", "first")]);
    let first = store.publish(&k, first_dir.path()).unwrap();

    let second_dir = tempfile::tempdir().unwrap();
    write_tree(second_dir.path(), &[("index.html", "second")]);
    let second = store.publish(&k, second_dir.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        std::fs::read_to_string(second.location.join("index.html")).unwrap(),
        "first"
    );
}

#[test]
fn empty_output_directory_is_a_valid_set() {
    let root = tempfile::tempdir().unwrap();
    let staged = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(root.path()).unwrap();

    let set = store.publish(&key("lint"), staged.path()).unwrap();
    assert!(set.files.is_empty());
    assert!(store.lookup(&key("lint")).unwrap().is_some());
}

#[test]
fn published_sets_do_not_alias_the_staging_directory() {
    let root = tempfile::tempdir().unwrap();
    let staged = tempfile::tempdir().unwrap();
    write_tree(staged.path(), &[("out.txt", "v1")]);
    let store = FsArtifactStore::open(root.path()).unwrap();

    let set = store.publish(&key("test"), staged.path()).unwrap();
    std::fs::write(staged.path().join("out.txt"), "v2").unwrap();

    assert_eq!(
        std::fs::read_to_string(set.location.join("out.txt")).unwrap(),
        "v1"
    );
}

#[test]
fn malformed_manifest_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(root.path()).unwrap();
    let k = CacheKey::from_hex("abcdef0123");

    let set_dir = root.path().join("artifacts/ab/cdef0123");
    std::fs::create_dir_all(&set_dir).unwrap();
    std::fs::write(set_dir.join(MANIFEST_FILE), "no-separator-here\n").unwrap();

    match store.lookup(&k).unwrap_err() {
        CacheStoreError::CorruptManifest { key, .. } => assert_eq!(key, "abcdef0123"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unwritable_store_root_fails_to_open() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let err = FsArtifactStore::open(&blocker).unwrap_err();
    assert!(matches!(err, CacheStoreError::Io { .. }));
}

#[test]
fn concurrent_publishes_of_one_key_agree() {
    let root = tempfile::tempdir().unwrap();
    let store = Arc::new(FsArtifactStore::open(root.path()).unwrap());
    let k = key("build");

    let staged: Vec<_> = (0..8)
        .map(|i| {
            let dir = tempfile::tempdir().unwrap();
            let contents = format!("writer {i}");
            write_tree(dir.path(), &[("artifact.bin", contents.as_str())]);
            dir
        })
        .collect();

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = staged
            .iter()
            .map(|dir| {
                let store = store.clone();
                let k = k.clone();
                s.spawn(move || store.publish(&k, dir.path()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let sets: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    for set in &sets[1..] {
        assert_eq!(set, &sets[0]);
    }
    let lookup = store.lookup(&k).unwrap().unwrap();
    assert_eq!(lookup, sets[0]);

    // No in-flight directories are left behind.
    assert_eq!(std::fs::read_dir(root.path().join("tmp")).unwrap().count(), 0);
}

#[test]
fn memory_store_counts_only_new_publishes() {
    let store = MemoryArtifactStore::new();
    let staged = tempfile::tempdir().unwrap();
    write_tree(staged.path(), &[("a.txt", "a")]);

    let first = store.publish(&key("deps"), staged.path()).unwrap();
    let again = store.publish(&key("deps"), staged.path()).unwrap();
    store.publish(&key("build"), staged.path()).unwrap();

    assert_eq!(first, again);
    assert_eq!(store.publish_count(), 2);
    assert_eq!(store.len(), 2);
    assert_eq!(store.lookup(&key("deps")).unwrap(), Some(first));
}
