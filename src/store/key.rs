// src/store/key.rs

use std::fmt;

use blake3::Hasher;

use crate::types::StageCommand;

const KEY_VERSION: &str = "scopebuild-cache-v1";

/// Opaque cache key (blake3 hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key of a stage invocation.
    ///
    /// Inputs: the stage name and command (so siblings sharing a snapshot and
    /// upstream never collide), the input snapshot digest and the upstream
    /// artifact key. Nothing else: the key never sees excluded paths.
    pub fn derive(
        stage: &str,
        command: &StageCommand,
        snapshot_digest: &str,
        upstream: Option<&CacheKey>,
    ) -> Self {
        let mut hasher = Hasher::new();
        for part in [
            KEY_VERSION,
            stage,
            &command.identity(),
            snapshot_digest,
            upstream.map(CacheKey::as_str).unwrap_or("-"),
        ] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        CacheKey(hasher.finalize().to_hex().to_string())
    }

    /// Wrap an existing hex key (e.g. read back from disk).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        CacheKey(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for logs and reports.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
