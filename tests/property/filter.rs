// tests/property/filter.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use scopebuild::filter::{InputSnapshot, SourceTree};
use scopebuild::fs::MockFileSystem;
use scopebuild::scope::{deps_only_scope, per_package_scope, Scope};

const BASE: &[(&str, &str)] = &[
    ("Cargo.toml", "[workspace]\n"),
    ("Cargo.lock", "# lock\n"),
    ("pkgA/Cargo.toml", "[package]\nname = \"pkgA\"\n"),
    ("pkgA/src/main.rs", "fn main() {}\n"),
    ("pkgB/Cargo.toml", "[package]\nname = \"pkgB\"\n"),
    ("lib/Cargo.toml", "[package]\nname = \"lib\"\n"),
];

// Lowercase names only, so generated files never collide with manifests.
// Directory names never contain a dot and file names always do, so a
// generated file never shadows a generated directory.
fn rel_path(top: &'static str) -> impl Strategy<Value = String> {
    (
        proptest::collection::vec("[a-z]{1,5}", 0..4),
        "[a-z]{1,6}",
        prop::sample::select(vec![".rs", ".md", ".txt", ".toml", ".json"]),
    )
        .prop_map(move |(dirs, name, ext)| {
            let mut parts = vec![top.to_string()];
            parts.extend(dirs);
            parts.push(format!("{name}{ext}"));
            parts.join("/")
        })
}

fn any_path() -> impl Strategy<Value = String> {
    prop_oneof![
        rel_path("pkgA"),
        rel_path("pkgB"),
        rel_path("lib"),
        rel_path("docs"),
    ]
}

fn files(top: Option<&'static str>) -> impl Strategy<Value = Vec<(String, String)>> {
    let path = match top {
        Some(top) => rel_path(top).boxed(),
        None => any_path().boxed(),
    };
    proptest::collection::btree_map(path, "[ -~]{0,20}", 0..12)
        .prop_map(|files: BTreeMap<String, String>| files.into_iter().collect::<Vec<_>>())
}

fn tree_with(extra: &[(String, String)]) -> (MockFileSystem, SourceTree) {
    let fs = MockFileSystem::with_files(BASE.iter().copied());
    for (path, contents) in extra {
        fs.add_file(path, contents.as_str());
    }
    let tree = SourceTree::open(Arc::new(fs.clone()), ".").unwrap();
    (fs, tree)
}

fn snapshot(scope: &Scope, tree: &SourceTree) -> InputSnapshot {
    scope.snapshot(tree).unwrap()
}

proptest! {
    #[test]
    fn snapshots_do_not_depend_on_creation_order(extra in files(None)) {
        let (_, forward) = tree_with(&extra);
        let reversed: Vec<_> = extra.iter().rev().cloned().collect();
        let (_, backward) = tree_with(&reversed);

        for scope in [deps_only_scope(), per_package_scope("pkgA", &["lib"]).unwrap()] {
            let a = snapshot(&scope, &forward);
            let b = snapshot(&scope, &backward);
            prop_assert_eq!(&a.digest, &b.digest);
            prop_assert_eq!(a.files, b.files);
        }
    }

    #[test]
    fn deps_scope_sees_only_manifests(extra in files(None)) {
        let (_, base) = tree_with(&[]);
        let (_, tree) = tree_with(&extra);
        let scope = deps_only_scope();

        let snap = snapshot(&scope, &tree);
        for path in snap.paths() {
            prop_assert!(path == "Cargo.lock" || path.ends_with("Cargo.toml"), "{}", path);
        }
        prop_assert_eq!(snap.digest, snapshot(&scope, &base).digest);
    }

    #[test]
    fn package_scope_ignores_sibling_sources(extra in files(Some("pkgB"))) {
        let (_, base) = tree_with(&[]);
        let (_, tree) = tree_with(&extra);
        let scope = per_package_scope("pkgA", &["lib"]).unwrap();

        let snap = snapshot(&scope, &tree);
        prop_assert!(snap.paths().all(|p| !p.starts_with("pkgB/") || p == "pkgB/Cargo.toml"));
        prop_assert_eq!(snap.digest, snapshot(&scope, &base).digest);
    }

    #[test]
    fn package_scope_tracks_its_own_sources(extra in files(Some("pkgA"))) {
        let (_, tree) = tree_with(&extra);
        let scope = per_package_scope::<&str>("pkgA", &[]).unwrap();

        let snap = snapshot(&scope, &tree);
        for (path, _) in &extra {
            prop_assert!(snap.contains(path), "{} missing", path);
        }
    }
}
