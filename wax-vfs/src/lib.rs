//! Wax Virtual File System
//!
//! Views are addressed by root-relative paths such as `/components/Nav.jsx`.
//! Every backend reports a change version for each file, which the module
//! cache uses to tell an edited view from a stale compiled copy.
//!
//! # Usage
//! ```rust
//! use wax_vfs::{VirtualFileSystem, MemoryFileSystem};
//! use std::path::Path;
//!
//! let fs = MemoryFileSystem::new();
//! fs.write_file(Path::new("/View.jsx"), b"export function View() {}").unwrap();
//! let content = fs.read_to_string(Path::new("/View.jsx")).unwrap();
//! assert!(content.starts_with("export"));
//! ```

mod error;
mod memory;
mod native;
mod r#trait;

pub use error::{VfsError, VfsResult};
pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;
pub use r#trait::VirtualFileSystem;
