// src/store/memory.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::info;

use crate::errors::CacheStoreError;
use crate::filter::compute_snapshot_digest;
use crate::store::fs_store::hash_dir;
use crate::store::{ArtifactSet, ArtifactStore, CacheKey};

/// Keeps artifact manifests in memory only (lost on exit).
///
/// File contents are not retained and `location` is a symbolic path, so this
/// only suits runs where no stage reads its upstream's files (tests).
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    sets: Mutex<HashMap<CacheKey, ArtifactSet>>,
    publishes: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish calls that created a new entry.
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.sets.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn lookup(&self, key: &CacheKey) -> Result<Option<ArtifactSet>, CacheStoreError> {
        let sets = self.sets.lock().map_err(|_| CacheStoreError::Poisoned)?;
        Ok(sets.get(key).cloned())
    }

    fn publish(&self, key: &CacheKey, staged_dir: &Path) -> Result<ArtifactSet, CacheStoreError> {
        let files = hash_dir(staged_dir)?;
        let mut sets = self.sets.lock().map_err(|_| CacheStoreError::Poisoned)?;
        if let Some(existing) = sets.get(key) {
            return Ok(existing.clone());
        }

        let set = ArtifactSet {
            key: key.clone(),
            location: PathBuf::from("memory").join(key.as_str()),
            digest: compute_snapshot_digest(&files),
            files,
        };
        sets.insert(key.clone(), set.clone());
        self.publishes.fetch_add(1, Ordering::SeqCst);
        info!(key = %key.short(), files = set.files.len(), "published artifact set (memory)");
        Ok(set)
    }
}
