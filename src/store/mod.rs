// src/store/mod.rs

//! Content-addressed artifact store.
//!
//! The store is the only mutable state shared between concurrently running
//! stages. It is append-only: a key is published at most once in effect,
//! and a published artifact set is never modified.
//!
//! - [`key`]: cache key derivation.
//! - [`fs_store`]: on-disk store with atomic directory publish.
//! - [`memory`]: in-memory store for tests and dry runs.

pub mod fs_store;
pub mod key;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::CacheStoreError;

pub use fs_store::FsArtifactStore;
pub use key::CacheKey;
pub use memory::MemoryArtifactStore;

/// Immutable output of one successful stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub key: CacheKey,
    /// Directory holding the artifact files; read-only for consumers.
    pub location: PathBuf,
    /// Relative path -> blake3 hex.
    pub files: BTreeMap<String, String>,
    /// Aggregate digest over `files`.
    pub digest: String,
}

/// Storage backend for artifact sets.
pub trait ArtifactStore: Send + Sync + Debug {
    /// Return the artifact set published under `key`, if any.
    fn lookup(&self, key: &CacheKey) -> Result<Option<ArtifactSet>, CacheStoreError>;

    /// Publish the files under `staged_dir` as the artifact set for `key`.
    ///
    /// If `key` is already published the existing set is returned unchanged;
    /// the value for a key is a pure function of the key, so either copy is
    /// correct.
    fn publish(&self, key: &CacheKey, staged_dir: &Path) -> Result<ArtifactSet, CacheStoreError>;
}
