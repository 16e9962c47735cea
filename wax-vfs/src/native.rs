//! Native file system implementation

use crate::error::{VfsError, VfsResult};
use crate::VirtualFileSystem;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A native OS file system implementation.
///
/// This wraps `std::fs` operations. With a base directory, view paths such
/// as `/components/Nav.jsx` are looked up under that directory; without
/// one, paths are used as given.
///
/// # Example
/// ```
/// use wax_vfs::{NativeFileSystem, VirtualFileSystem};
/// use std::path::Path;
///
/// let fs = NativeFileSystem::with_base(std::env::temp_dir());
/// assert!(fs.is_dir(Path::new("/")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NativeFileSystem {
    base: Option<PathBuf>,
}

impl NativeFileSystem {
    /// Create a new native file system using paths as given.
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Create a new native file system with a base directory.
    ///
    /// All paths will be relative to this base directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// The base directory, if any.
    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Map a view path onto the host file system.
    fn host_path(&self, path: &Path) -> VfsResult<PathBuf> {
        let Some(base) = &self.base else {
            return Ok(path.to_path_buf());
        };
        let mut joined = base.clone();
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::Normal(part) => joined.push(part),
                Component::ParentDir => {
                    return Err(VfsError::InvalidPath {
                        path: path.to_string_lossy().to_string(),
                        reason: String::from("parent components are not allowed"),
                    })
                }
            }
        }
        Ok(joined)
    }
}

impl VirtualFileSystem for NativeFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let host = self.host_path(path)?;
        std::fs::read(&host).map_err(|e| VfsError::from_io(e, &path.to_string_lossy()))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()> {
        let host = self.host_path(path)?;
        std::fs::write(&host, content).map_err(|e| VfsError::from_io(e, &path.to_string_lossy()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.host_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.host_path(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.host_path(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn modified(&self, path: &Path) -> VfsResult<i64> {
        let host = self.host_path(path)?;
        let metadata =
            std::fs::metadata(&host).map_err(|e| VfsError::from_io(e, &path.to_string_lossy()))?;
        let mtime = metadata
            .modified()
            .map_err(|e| VfsError::from_io(e, &path.to_string_lossy()))?;
        let micros = match mtime.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_micros() as i64,
            Err(before) => -(before.duration().as_micros() as i64),
        };
        Ok(micros)
    }

    fn root_key(&self) -> String {
        match &self.base {
            Some(base) => format!("native:{}", base.display()),
            None => String::from("native:"),
        }
    }
}
