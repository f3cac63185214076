// src/exec/materialize.rs

//! Copy a snapshot out of the source tree into a private staging directory.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::errors::FilterError;
use crate::filter::{InputSnapshot, SourceTree};

/// Write every file of `snapshot` under `dest`, preserving relative paths.
///
/// Each file is re-hashed as it is copied; a file whose contents no longer
/// match the snapshot yields [`FilterError::Changed`], so a stage never runs
/// against inputs that differ from the ones its cache key was derived from.
pub fn materialize(
    tree: &SourceTree,
    snapshot: &InputSnapshot,
    dest: &Path,
) -> Result<(), FilterError> {
    for (rel, expected) in &snapshot.files {
        let src = tree.root().join(rel);
        let bytes = tree
            .fs()
            .read(&src)
            .map_err(|cause| FilterError::Io {
                path: src.clone(),
                cause,
            })?;

        if blake3::hash(&bytes).to_hex().as_str() != expected {
            return Err(FilterError::Changed(src));
        }

        let target = dest.join(rel);
        write_file(&target, &bytes).map_err(|cause| FilterError::Io {
            path: target.clone(),
            cause,
        })?;
    }

    debug!(
        files = snapshot.files.len(),
        dest = %dest.display(),
        "materialized snapshot"
    );
    Ok(())
}

fn write_file(target: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {:?}", parent))?;
    }
    fs::write(target, bytes).with_context(|| format!("writing {:?}", target))
}
