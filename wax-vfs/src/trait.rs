//! VirtualFileSystem trait definition

use crate::error::{VfsError, VfsResult};
use std::path::Path;

/// Virtual File System trait
///
/// Provides a unified interface for file operations, decoupling view
/// resolution from specific file system implementations.
///
/// # Implementations
/// - `MemoryFileSystem`: In-memory file system
/// - `NativeFileSystem`: Native OS file system under a base directory
pub trait VirtualFileSystem: Send + Sync {
    /// Read file contents
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>>;

    /// Write file contents
    ///
    /// Creates the file if it doesn't exist, truncates it if it does.
    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Change version of a file
    ///
    /// Any change to the file content yields a different value. Native files
    /// report their modification time in microseconds.
    fn modified(&self, path: &Path) -> VfsResult<i64>;

    /// Identity of the file tree behind this instance
    ///
    /// Two instances report the same key only when they serve the same
    /// files, so compiled views can be shared between them.
    fn root_key(&self) -> String;

    /// Read file contents as UTF-8 text
    fn read_to_string(&self, path: &Path) -> VfsResult<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::InvalidUtf8 {
            path: path.to_string_lossy().replace('\\', "/"),
        })
    }
}
