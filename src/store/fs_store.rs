// src/store/fs_store.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::CacheStoreError;
use crate::filter::{compute_file_hash, compute_snapshot_digest};
use crate::fs::RealFileSystem;
use crate::store::{ArtifactSet, ArtifactStore, CacheKey};

/// Name of the manifest file inside each artifact set directory.
pub const MANIFEST_FILE: &str = "MANIFEST";

/// Filesystem-backed artifact store with git-style 2-char sharding.
///
/// Layout:
///
/// ```text
/// <root>/artifacts/<key[..2]>/<key[2..]>/MANIFEST
/// <root>/artifacts/<key[..2]>/<key[2..]>/files/...
/// <root>/tmp/                     (in-flight publishes)
/// ```
///
/// A set becomes visible by renaming a fully written directory into place,
/// so readers never observe a partial set.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheStoreError> {
        let root = root.into();
        for dir in [root.join("artifacts"), root.join("tmp")] {
            fs::create_dir_all(&dir).map_err(|e| CacheStoreError::io(&dir, e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn set_dir(&self, key: &CacheKey) -> PathBuf {
        let hex = key.as_str();
        let split = hex.len().min(2);
        self.root
            .join("artifacts")
            .join(&hex[..split])
            .join(&hex[split..])
    }

    fn read_set(&self, key: &CacheKey, dir: &Path) -> Result<ArtifactSet, CacheStoreError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let file = File::open(&manifest_path).map_err(|e| CacheStoreError::io(&manifest_path, e))?;
        let reader = BufReader::new(file);

        let mut files = BTreeMap::new();
        for line_res in reader.lines() {
            let line = line_res.map_err(|e| CacheStoreError::io(&manifest_path, e))?;
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let Some((hash, rel)) = trimmed.split_once(' ') else {
                return Err(CacheStoreError::CorruptManifest {
                    key: key.to_string(),
                    message: format!("malformed line: {trimmed}"),
                });
            };
            files.insert(rel.to_string(), hash.to_string());
        }

        Ok(ArtifactSet {
            key: key.clone(),
            location: dir.join("files"),
            digest: compute_snapshot_digest(&files),
            files,
        })
    }
}

impl ArtifactStore for FsArtifactStore {
    fn lookup(&self, key: &CacheKey) -> Result<Option<ArtifactSet>, CacheStoreError> {
        let dir = self.set_dir(key);
        if !dir.join(MANIFEST_FILE).is_file() {
            return Ok(None);
        }
        self.read_set(key, &dir).map(Some)
    }

    fn publish(&self, key: &CacheKey, staged_dir: &Path) -> Result<ArtifactSet, CacheStoreError> {
        let final_dir = self.set_dir(key);
        if final_dir.join(MANIFEST_FILE).is_file() {
            debug!(key = %key.short(), "key already published; keeping existing set");
            return self.read_set(key, &final_dir);
        }

        let files = hash_dir(staged_dir)?;

        let tmp_root = self.root.join("tmp");
        let tmp = tempfile::Builder::new()
            .prefix(key.short())
            .tempdir_in(&tmp_root)
            .map_err(|e| CacheStoreError::io(&tmp_root, e))?;

        copy_tree(staged_dir, &tmp.path().join("files"))?;
        write_manifest(&tmp.path().join(MANIFEST_FILE), &files)?;

        let shard = final_dir.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&shard).map_err(|e| CacheStoreError::io(&shard, e))?;

        match fs::rename(tmp.path(), &final_dir) {
            Ok(()) => {
                info!(
                    key = %key.short(),
                    files = files.len(),
                    "published artifact set"
                );
            }
            Err(e) if final_dir.join(MANIFEST_FILE).is_file() => {
                // Another executor published the same key first.
                debug!(key = %key.short(), error = %e, "lost publish race; keeping existing set");
            }
            Err(e) => return Err(CacheStoreError::io(&final_dir, e)),
        }

        self.read_set(key, &final_dir)
    }
}

/// Hash every regular file below `dir`, keyed by POSIX relative path.
pub(crate) fn hash_dir(dir: &Path) -> Result<BTreeMap<String, String>, CacheStoreError> {
    let fs = RealFileSystem;
    let mut files = BTreeMap::new();
    if !dir.exists() {
        return Ok(files);
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = fs::read_dir(&current).map_err(|e| CacheStoreError::io(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheStoreError::io(&current, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = path
                    .strip_prefix(dir)
                    .map(|r| r.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                let hash = compute_file_hash(&fs, &path).map_err(|e| {
                    CacheStoreError::io(&path, std::io::Error::other(format!("{e:#}")))
                })?;
                files.insert(rel, hash);
            }
        }
    }
    Ok(files)
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), CacheStoreError> {
    fs::create_dir_all(to).map_err(|e| CacheStoreError::io(to, e))?;
    if !from.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(from).map_err(|e| CacheStoreError::io(from, e))? {
        let entry = entry.map_err(|e| CacheStoreError::io(from, e))?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        if src.is_dir() {
            copy_tree(&src, &dst)?;
        } else if src.is_file() {
            fs::copy(&src, &dst).map_err(|e| CacheStoreError::io(&src, e))?;
        }
    }
    Ok(())
}

fn write_manifest(path: &Path, files: &BTreeMap<String, String>) -> Result<(), CacheStoreError> {
    let file = File::create(path).map_err(|e| CacheStoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for (rel, hash) in files {
        writeln!(writer, "{hash} {rel}").map_err(|e| CacheStoreError::io(path, e))?;
    }
    writer.flush().map_err(|e| CacheStoreError::io(path, e))
}
