// src/filter/tree.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::FilterError;
use crate::filter::path_utils::{join_rel, relative_str};
use crate::filter::ruleset::{EntryKind, RuleSet};
use crate::fs::FileSystem;

/// A read-only view of the workspace: a filesystem plus the root every rule
/// is evaluated against.
///
/// `ignored` lists relative paths that are not part of the tree at all (the
/// VCS directory, cargo's `target/`, the artifact store when it lives inside
/// the workspace). They are pruned before any rule is consulted.
#[derive(Debug, Clone)]
pub struct SourceTree {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    ignored: BTreeSet<String>,
}

/// Result of walking a tree with a rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeWalk {
    /// Included files as `(relative path, full path)`, sorted by relative path.
    pub files: Vec<(String, PathBuf)>,
    /// Directories that were descended into, sorted.
    pub traversed_dirs: BTreeSet<String>,
}

impl SourceTree {
    /// Open a tree, checking that `root` exists and is a directory.
    pub fn open(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Result<Self, FilterError> {
        let root = root.into();
        if !fs.exists(&root) {
            return Err(FilterError::RootMissing(root));
        }
        if !fs.is_dir(&root) {
            return Err(FilterError::RootNotDirectory(root));
        }
        Ok(Self {
            fs,
            root,
            ignored: BTreeSet::new(),
        })
    }

    /// Exclude the given relative paths (and everything below them).
    pub fn with_ignored<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(
            paths
                .into_iter()
                .map(Into::into)
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
        );
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.ignored.iter().any(|ignored| {
            rel_path == ignored
                || rel_path
                    .strip_prefix(ignored.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Path of `path` relative to the root, in rule syntax.
    pub fn relative(&self, path: &Path) -> Result<String, FilterError> {
        relative_str(&self.root, path).ok_or_else(|| FilterError::OutsideRoot {
            root: self.root.clone(),
            path: path.to_path_buf(),
        })
    }

    /// Per-path inclusion decision for a single path inside the tree.
    ///
    /// The root itself is always included and a symlink never is. This
    /// checks only `path`, not
    /// whether its ancestors would have been traversed; use [`Self::walk`]
    /// for snapshot semantics.
    pub fn included(&self, path: &Path, rules: &RuleSet) -> Result<bool, FilterError> {
        let rel = self.relative(path)?;
        if rel.is_empty() {
            return Ok(true);
        }
        if self.is_ignored(&rel) {
            return Ok(false);
        }
        let full = self.root.join(&rel);
        if self.fs.is_symlink(&full) {
            return Ok(false);
        }
        let kind = if self.fs.is_dir(&full) {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Ok(rules.included(&rel, kind))
    }

    /// Walk the tree from the root, descending only into directories the
    /// rule set includes and collecting the files it includes.
    ///
    /// Symlinks below the root are skipped, whether they point at files or
    /// directories.
    pub fn walk(&self, rules: &RuleSet) -> Result<TreeWalk, FilterError> {
        let mut walk = TreeWalk::default();
        let mut stack: Vec<(String, PathBuf)> = vec![(String::new(), self.root.clone())];

        while let Some((rel_dir, dir)) = stack.pop() {
            let entries = self.fs.read_dir(&dir).map_err(|cause| FilterError::Io {
                path: dir.clone(),
                cause,
            })?;

            for path in entries {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    debug!(path = ?path, "skipping entry with non UTF-8 name");
                    continue;
                };
                let rel = join_rel(&rel_dir, name);
                if self.is_ignored(&rel) {
                    trace!(path = %rel, "ignored");
                    continue;
                }
                // A link target is not part of the tree: it may sit outside
                // the root or lead back into it.
                if self.fs.is_symlink(&path) {
                    debug!(path = %rel, "skipping symlink");
                    continue;
                }

                if self.fs.is_dir(&path) {
                    if rules.included(&rel, EntryKind::Dir) {
                        walk.traversed_dirs.insert(rel.clone());
                        stack.push((rel, path));
                    } else {
                        trace!(path = %rel, "directory not traversed");
                    }
                } else if self.fs.is_file(&path) && rules.included(&rel, EntryKind::File) {
                    walk.files.push((rel, path));
                }
            }
        }

        walk.files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(walk)
    }
}
