// src/fs/mod.rs

//! Read-only access to the source tree.
//!
//! The filter engine and snapshotter only ever see a tree through
//! [`FileSystem`], so scopes can be evaluated against an in-memory tree in
//! tests ([`mock::MockFileSystem`]) exactly as against the real workspace.

use std::fmt::Debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

pub use mock::MockFileSystem;

/// What the walker and snapshotter need from a tree.
///
/// Errors carry context through `anyhow`; callers wrap them into
/// [`FilterError::Io`](crate::errors::FilterError::Io) with the offending path.
pub trait FileSystem: Send + Sync + Debug {
    /// Whole contents of a file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Streaming reader, used when hashing large inputs.
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;

    fn exists(&self, path: &Path) -> bool;

    /// Both follow symlinks.
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` itself is a symlink, without following it.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Entries of a directory as full paths. Order is unspecified.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// The workspace on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading source file {}", path.display()))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path)
            .with_context(|| format!("opening source file {}", path.display()))?;
        Ok(Box::new(file))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn is_file(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|m| m.is_file())
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|m| m.is_dir())
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .with_context(|| format!("listing directory {}", path.display()))?
            .map(|entry| {
                entry
                    .map(|e| e.path())
                    .with_context(|| format!("listing directory {}", path.display()))
            })
            .collect()
    }
}
