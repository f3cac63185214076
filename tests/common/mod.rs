#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use scopebuild::filter::SourceTree;
use scopebuild::fs::MockFileSystem;

pub use scopebuild_test_utils::builders;
pub use scopebuild_test_utils::{init_tracing, with_timeout};

/// A small workspace: root manifests, two packages, a shared library and
/// some docs.
pub const WORKSPACE: &[(&str, &str)] = &[
    ("Cargo.toml", "[workspace]\nmembers = [\"pkgA\", \"pkgB\", \"lib\"]\n"),
    ("Cargo.lock", "# lock v1\n"),
    ("pkgA/Cargo.toml", "[package]\nname = \"pkgA\"\n"),
    ("pkgA/src/main.rs", "fn main() {}\n"),
    ("pkgB/Cargo.toml", "[package]\nname = \"pkgB\"\n"),
    ("pkgB/src/main.rs", "fn main() { println!(\"b\"); }\n"),
    ("pkgB/src/deep/file.rs", "pub fn deep() {}\n"),
    ("lib/Cargo.toml", "[package]\nname = \"lib\"\n"),
    ("lib/src/lib.rs", "pub fn shared() {}\n"),
    ("docs/doc/guide.md", "# Guide\n"),
    ("NOTES.txt", "notes\n"),
    ("README.md", "readme\n"),
];

pub fn workspace_fs() -> MockFileSystem {
    MockFileSystem::with_files(WORKSPACE.iter().copied())
}

pub fn mock_tree(fs: &MockFileSystem) -> SourceTree {
    SourceTree::open(Arc::new(fs.clone()), ".").expect("mock root is a directory")
}

/// Write `(path, contents)` pairs under `root`, creating parents.
pub fn write_tree(root: &Path, entries: &[(&str, &str)]) {
    for (rel, contents) in entries {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

pub fn sorted<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = items.into_iter().map(str::to_string).collect();
    out.sort();
    out
}
