//! VFS errors

use thiserror::Error;

pub type VfsResult<T> = Result<T, VfsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("no such file: {path}")]
    NotFound { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    /// Rejected before touching the backend, e.g. a path leaving the view root
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// View sources must be UTF-8 text
    #[error("not valid UTF-8: {path}")]
    InvalidUtf8 { path: String },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    /// A writer panicked while holding the file table
    #[error("file table is poisoned")]
    Poisoned,
}

impl VfsError {
    /// Whether the file is simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound { .. })
    }

    pub(crate) fn from_io(err: std::io::Error, path: &str) -> Self {
        let path = path.to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => VfsError::PermissionDenied { path },
            _ => VfsError::Io {
                path,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = VfsError::NotFound {
            path: "/View.jsx".to_string(),
        };
        assert_eq!(err.to_string(), "no such file: /View.jsx");

        let err = VfsError::InvalidPath {
            path: "../x".to_string(),
            reason: "escapes root".to_string(),
        };
        assert_eq!(err.to_string(), "invalid path '../x': escapes root");
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let err = VfsError::from_io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/a.jsx",
        );
        assert!(err.is_not_found());

        let err = VfsError::from_io(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
            "/a.jsx",
        );
        assert_eq!(
            err,
            VfsError::PermissionDenied {
                path: "/a.jsx".to_string()
            }
        );

        let err = VfsError::from_io(std::io::Error::new(std::io::ErrorKind::Other, "boom"), "/a");
        assert_eq!(err.to_string(), "I/O error on '/a': boom");
    }
}
