// src/filter/mod.rs

//! Path filter engine.
//!
//! Decides, per path, whether a path of the source tree belongs to a build
//! input snapshot:
//! - [`rule`]: exact and full-match regex rules.
//! - [`ruleset`]: ordered rules + traversal mode, with the pure
//!   `included(rel_path, kind)` decision.
//! - [`tree`]: a source root over a [`crate::fs::FileSystem`] and the
//!   rule-driven walk.
//! - [`snapshot`]: content hashing of the walk result.

pub mod path_utils;
pub mod rule;
pub mod ruleset;
pub mod snapshot;
pub mod tree;

pub use rule::Rule;
pub use ruleset::{EntryKind, RuleSet};
pub use snapshot::{compute_file_hash, compute_snapshot_digest, InputSnapshot};
pub use tree::{SourceTree, TreeWalk};
