//! 规范模块标识

use std::fmt;

/// 规范模块标识
///
/// `path` 是以 `/` 开头的根相对路径，`version` 是文件的修改版本。
/// 同一文件同一版本的两次解析得到相同的标识；文件被修改后版本变化，
/// 旧的缓存项自然失效。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    pub path: String,
    pub version: i64,
}

impl ModuleId {
    pub fn new(path: impl Into<String>, version: i64) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    /// `file:///dir/View.jsx?ts=<十六进制版本>`
    pub fn url(&self) -> String {
        format!("file://{}?ts={:x}", self.path, self.version)
    }

    /// 所在目录，根目录为 `/`
    pub fn dirname(&self) -> &str {
        match self.path.rfind('/') {
            Some(0) | None => "/",
            Some(i) => &self.path[..i],
        }
    }

    /// 完整文件路径
    pub fn filename(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
