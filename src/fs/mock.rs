use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // child names
}

/// In-memory tree rooted at `"."`.
///
/// Paths are used verbatim as keys, so tests should consistently use either
/// `"pkgA/src/x.rs"` or `"./pkgA/src/x.rs"` style; `add_file` normalises a
/// leading `"./"` away.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    /// Build a tree from `(path, contents)` pairs.
    pub fn with_files<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fs = Self::new();
        for (path, contents) in entries {
            fs.add_file(path, contents);
        }
        fs
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        // A panic while holding the lock can only come from a test that is
        // already failing.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or overwrite a file, creating parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalise(path.as_ref());
        let mut files = self.lock();
        files.insert(path.clone(), MockEntry::File(content.into()));
        let parent = parent_of(&path);
        ensure_dir_entry(&mut files, &parent);
        link_child(&mut files, &parent, &path);
    }

    /// Insert an (empty) directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalise(path.as_ref());
        let mut files = self.lock();
        ensure_dir_entry(&mut files, &path);
    }

    /// Remove a file (no-op if absent).
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = normalise(path.as_ref());
        let mut files = self.lock();
        if matches!(files.get(&path), Some(MockEntry::File(_))) {
            files.remove(&path);
            let parent = parent_of(&path);
            if let (Some(MockEntry::Dir(children)), Some(name)) = (
                files.get_mut(&parent),
                path.file_name().and_then(|n| n.to_str()),
            ) {
                children.retain(|c| c != name);
            }
        }
    }
}

fn normalise(path: &Path) -> PathBuf {
    match path.strip_prefix(".") {
        Ok(rest) if !rest.as_os_str().is_empty() => rest.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn link_child(files: &mut BTreeMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let (Some(MockEntry::Dir(children)), Some(name)) = (
        files.get_mut(parent),
        child.file_name().and_then(|n| n.to_str()),
    ) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

fn ensure_dir_entry(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    let parent = parent_of(path);
    if parent != path {
        ensure_dir_entry(files, &parent);
        link_child(files, &parent, path);
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.lock();
        match files.get(&normalise(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let content = self.read(path)?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&normalise(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&normalise(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&normalise(path)), Some(MockEntry::Dir(_)))
    }

    // The in-memory tree has no links.
    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        let key = normalise(path);
        match files.get(&key) {
            Some(MockEntry::Dir(children)) => {
                if key == Path::new(".") {
                    Ok(children.iter().map(PathBuf::from).collect())
                } else {
                    Ok(children.iter().map(|name| key.join(name)).collect())
                }
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
