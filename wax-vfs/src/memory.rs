//! In-memory file system implementation

use crate::error::{VfsError, VfsResult};
use crate::VirtualFileSystem;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Vec<u8>,
    version: i64,
}

/// An in-memory file system implementation.
///
/// All files are stored in memory using a `BTreeMap`, making it suitable
/// for tests and embedded view bundles. Each write bumps a shared counter,
/// which becomes the file's change version. Clones share both the files and
/// the [`root_key`](VirtualFileSystem::root_key); separately created
/// instances never do.
///
/// # Example
/// ```
/// use wax_vfs::{MemoryFileSystem, VirtualFileSystem};
/// use std::path::Path;
///
/// let fs = MemoryFileSystem::new();
/// fs.write_file(Path::new("/View.jsx"), b"hello").unwrap();
/// let first = fs.modified(Path::new("/View.jsx")).unwrap();
/// fs.write_file(Path::new("/View.jsx"), b"hello again").unwrap();
/// assert_ne!(first, fs.modified(Path::new("/View.jsx")).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<String, MemoryFile>>>,
    clock: Arc<AtomicI64>,
    instance: u64,
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

impl MemoryFileSystem {
    /// Create a new empty memory file system.
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
            clock: Arc::new(AtomicI64::new(0)),
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Create a new memory file system pre-populated with files.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, S, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let fs = Self::new();
        if let Ok(mut map) = fs.files.write() {
            for (path, content) in files {
                let version = fs.clock.fetch_add(1, Ordering::Relaxed) + 1;
                map.insert(
                    normalize_path(Path::new(path.as_ref())),
                    MemoryFile {
                        content: content.into(),
                        version,
                    },
                );
            }
        }
        fs
    }

    /// Remove a file. Returns whether it existed.
    pub fn remove_file(&self, path: &Path) -> VfsResult<bool> {
        let mut files = self.files.write().map_err(poisoned)?;
        Ok(files.remove(&normalize_path(path)).is_some())
    }

    /// All stored file paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        match self.files.read() {
            Ok(files) => files.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Normalize a path string for internal storage.
/// Uses forward slashes and a single leading slash.
fn normalize_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let trimmed = raw.trim_start_matches('/');
    format!("/{}", trimmed)
}

fn poisoned<T>(_: T) -> VfsError {
    VfsError::Poisoned
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let normalized = normalize_path(path);
        let files = self.files.read().map_err(poisoned)?;

        files
            .get(&normalized)
            .map(|file| file.content.clone())
            .ok_or(VfsError::NotFound { path: normalized })
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()> {
        let normalized = normalize_path(path);
        let mut files = self.files.write().map_err(poisoned)?;
        let version = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        files.insert(
            normalized,
            MemoryFile {
                content: content.to_vec(),
                version,
            },
        );
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        match self.files.read() {
            Ok(files) => files.contains_key(&normalize_path(path)),
            Err(_) => false,
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        // Directories exist implicitly as prefixes of stored files
        let mut prefix = normalize_path(path);
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        match self.files.read() {
            Ok(files) => files.keys().any(|key| key.starts_with(&prefix)),
            Err(_) => false,
        }
    }

    fn modified(&self, path: &Path) -> VfsResult<i64> {
        let normalized = normalize_path(path);
        let files = self.files.read().map_err(poisoned)?;
        files
            .get(&normalized)
            .map(|file| file.version)
            .ok_or(VfsError::NotFound { path: normalized })
    }

    fn root_key(&self) -> String {
        format!("memory:{}", self.instance)
    }
}
