//! 视图解析器
//!
//! 把视图名和相对 import 路径映射为 [`ModuleId`]，并读取模块源码。
//!
//! # 解析规则
//! - `pages/Home` → 依次尝试 `/pages/Home`、`/pages/Home.tsx`、`/pages/Home.jsx`
//! - `./Nav` （在 `/pages/Home.jsx` 中）→ `/pages/Nav.tsx` 或 `/pages/Nav.jsx`
//! - `../lib/util.js` → 规范化 `..` 后按原名查找
//! - 非相对路径（`react`）和越过根目录的路径被拒绝

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use wax_vfs::VirtualFileSystem;

use super::id::ModuleId;

/// 解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// 视图不存在
    #[error("view '{name}' not found")]
    ViewNotFound { name: String },

    /// import 目标不存在
    #[error("cannot find module '{path}' imported from '{from}'")]
    ModuleNotFound { path: String, from: String },

    /// import 路径过短
    #[error("invalid import path '{path}'")]
    InvalidImportPath { path: String },

    /// 非相对路径
    #[error("only relative path is supported: '{path}'")]
    NotRelative { path: String },

    /// 路径越过根目录
    #[error("path '{path}' escapes the view root")]
    EscapesRoot { path: String },

    /// 读取失败
    #[error("failed to read '{path}': {message}")]
    Read { path: String, message: String },
}

impl ResolveError {
    /// 错误所属的文件（若已知）
    pub fn file(&self) -> Option<&str> {
        match self {
            ResolveError::Read { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// 视图解析接口
pub trait ViewResolver: Send + Sync {
    /// 视图名 → 模块标识
    fn resolve_view(&self, name: &str) -> ResolveResult<ModuleId>;

    /// 相对 import 路径 → 模块标识
    fn resolve_module(&self, from: &ModuleId, import_path: &str) -> ResolveResult<ModuleId>;

    /// 读取模块源码
    fn get_content(&self, id: &ModuleId) -> ResolveResult<String>;

    /// 缓存命名空间：命名空间不同的解析器，相同的标识也可能指向不同源码
    fn namespace(&self) -> String;
}

/// 基于虚拟文件系统的解析器
pub struct FsViewResolver {
    fs: Arc<dyn VirtualFileSystem>,
    extensions: Vec<String>,
}

impl FsViewResolver {
    /// 使用默认扩展名（`.tsx`、`.jsx`）
    pub fn new(fs: Arc<dyn VirtualFileSystem>) -> Self {
        Self {
            fs,
            extensions: vec![".tsx".to_string(), ".jsx".to_string()],
        }
    }

    /// 设置候选扩展名，按顺序尝试
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// 按候选顺序查找存在的文件
    fn find(&self, path: &str) -> Option<ModuleId> {
        let candidates = std::iter::once(path.to_string())
            .chain(self.extensions.iter().map(|ext| format!("{}{}", path, ext)));

        for candidate in candidates {
            let host = Path::new(&candidate);
            if !self.fs.is_file(host) {
                continue;
            }
            // 文件存在但无法取得版本时按不存在处理
            if let Ok(version) = self.fs.modified(host) {
                return Some(ModuleId::new(candidate, version));
            }
        }
        None
    }
}

/// 拼接并规范化路径，结果以 `/` 开头
pub(crate) fn normalize(base: &str, relative: &str) -> ResolveResult<String> {
    let mut parts: Vec<&str> = Vec::new();
    let joined = if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("{}/{}", base, relative)
    };

    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(ResolveError::EscapesRoot {
                        path: relative.to_string(),
                    });
                }
            }
            other => parts.push(other),
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

impl ViewResolver for FsViewResolver {
    fn resolve_view(&self, name: &str) -> ResolveResult<ModuleId> {
        let path = normalize("/", name)?;
        self.find(&path).ok_or_else(|| ResolveError::ViewNotFound {
            name: name.to_string(),
        })
    }

    fn resolve_module(&self, from: &ModuleId, import_path: &str) -> ResolveResult<ModuleId> {
        if import_path.len() < 3 {
            return Err(ResolveError::InvalidImportPath {
                path: import_path.to_string(),
            });
        }
        if !import_path.starts_with('.') {
            return Err(ResolveError::NotRelative {
                path: import_path.to_string(),
            });
        }

        let path = normalize(from.dirname(), import_path)?;
        self.find(&path).ok_or_else(|| ResolveError::ModuleNotFound {
            path: import_path.to_string(),
            from: from.path.clone(),
        })
    }

    fn get_content(&self, id: &ModuleId) -> ResolveResult<String> {
        self.fs
            .read_to_string(Path::new(&id.path))
            .map_err(|e| ResolveError::Read {
                path: id.path.clone(),
                message: e.to_string(),
            })
    }

    fn namespace(&self) -> String {
        self.fs.root_key()
    }
}
