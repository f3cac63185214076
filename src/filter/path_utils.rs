// src/filter/path_utils.rs

//! Utility functions for turning tree paths into rule-matchable strings.

use std::path::{Component, Path};

/// Convert a path into a string relative to `root`, with forward slashes and
/// no leading slash.
///
/// - A direct `strip_prefix(root)` is tried first.
/// - A root of `"."` accepts any relative path as-is.
/// - Otherwise both paths are canonicalized and the prefix is stripped again
///   (symlinked roots, `/private/var` on macOS).
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_posix(rel));
    }

    if root == Path::new(".") && path.is_relative() {
        let rel = path.strip_prefix(".").unwrap_or(path);
        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }
        return Some(to_posix(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_posix(rel));
        }
    }

    None
}

/// Join a parent relative path and a child name.
pub fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn to_posix(rel: &Path) -> String {
    rel.to_string_lossy()
        .replace('\\', "/")
        .trim_start_matches('/')
        .to_string()
}
