// src/filter/snapshot.rs

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::errors::FilterError;
use crate::filter::ruleset::RuleSet;
use crate::filter::tree::SourceTree;
use crate::fs::FileSystem;

/// The identity of a scope applied to a tree: every included file with its
/// content hash, plus an aggregate digest.
///
/// Only files contribute to `digest`. Traversed directories are recorded for
/// diagnostics but never hashed, so an unrelated first-level directory
/// appearing or disappearing cannot change the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Relative path -> blake3 hex of the file contents.
    pub files: BTreeMap<String, String>,
    pub traversed_dirs: BTreeSet<String>,
    pub digest: String,
}

impl InputSnapshot {
    /// Apply `rules` to `tree` and hash every included file.
    pub fn capture(tree: &SourceTree, rules: &RuleSet) -> Result<Self, FilterError> {
        let walk = tree.walk(rules)?;
        let mut files = BTreeMap::new();

        for (rel, full) in walk.files {
            let hash = compute_file_hash(tree.fs(), &full).map_err(|cause| FilterError::Io {
                path: full.clone(),
                cause,
            })?;
            files.insert(rel, hash);
        }

        let digest = compute_snapshot_digest(&files);
        debug!(
            files = files.len(),
            dirs = walk.traversed_dirs.len(),
            digest = %digest,
            "captured input snapshot"
        );

        Ok(Self {
            files,
            traversed_dirs: walk.traversed_dirs,
            digest,
        })
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.files.contains_key(rel_path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Aggregate digest over `(path, hash)` pairs.
///
/// `BTreeMap` iteration order keeps this independent of walk order. Paths are
/// hashed along with contents so a rename changes the digest.
pub fn compute_snapshot_digest(files: &BTreeMap<String, String>) -> String {
    let mut hasher = Hasher::new();
    for (path, hash) in files {
        hasher.update(path.as_bytes());
        hasher.update(&[0]);
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}
