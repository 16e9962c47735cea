//! 渲染错误

use thiserror::Error;
use wax_config::Phase;

use crate::compiler::module::LoadError;

/// 一次渲染的唯一错误
///
/// `file` 是出错时所在的文件；`stack` 只在执行阶段存在。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    pub phase: Phase,
    pub file: Option<String>,
    pub message: String,
    pub stack: Option<String>,
}

impl RenderError {
    pub fn new(phase: Phase, file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            phase,
            file: file.map(str::to_string),
            message: message.into(),
            stack: None,
        }
    }

    pub fn load(file: &str, message: impl Into<String>) -> Self {
        Self::new(Phase::Load, Some(file), message)
    }

    pub fn execute(file: &str, message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            stack,
            ..Self::new(Phase::Execute, Some(file), message)
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(Phase::Other, None, message)
    }
}

impl From<LoadError> for RenderError {
    fn from(err: LoadError) -> Self {
        Self::new(err.phase(), err.file(), err.to_string())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::module::ResolveError;
    use crate::compiler::rewriter::RewriteError;

    #[test]
    fn test_from_load_error() {
        let err: RenderError = LoadError::Rewrite {
            file: "/View.jsx".to_string(),
            source: RewriteError::Syntax { start: 2, end: 3 },
        }
        .into();
        assert_eq!(err.phase, Phase::Load);
        assert_eq!(err.file.as_deref(), Some("/View.jsx"));
        assert_eq!(err.message, "error on lines 2:3");
    }

    #[test]
    fn test_compile_phase() {
        let err: RenderError = LoadError::Compile {
            file: "/View.jsx".to_string(),
            message: "bad".to_string(),
        }
        .into();
        assert_eq!(err.phase, Phase::Compile);
    }

    #[test]
    fn test_read_error_keeps_file() {
        let err: RenderError = LoadError::Resolve(ResolveError::Read {
            path: "/a.jsx".to_string(),
            message: "gone".to_string(),
        })
        .into();
        assert_eq!(err.phase, Phase::Load);
        assert_eq!(err.file.as_deref(), Some("/a.jsx"));
    }
}
