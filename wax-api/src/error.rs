//! API 错误类型
//!
//! 提供统一的错误类型和结构化错误报告。

use serde::Serialize;
use thiserror::Error;
use wax_config::Phase;
use wax_core::RenderError;

/// Wax 错误类型
///
/// 每次失败的渲染只产生一个错误，带有出错阶段、文件和（执行阶段的）调用栈。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("wax error [{}]: {}{}", phase_name(.phase), file_prefix(.file), .message)]
pub struct WaxError {
    phase: Phase,
    file: Option<String>,
    message: String,
    stack: Option<String>,
}

fn phase_name(phase: &Phase) -> &'static str {
    phase.as_str()
}

fn file_prefix(file: &Option<String>) -> String {
    match file {
        Some(file) => format!("'{}': ", file),
        None => String::new(),
    }
}

impl WaxError {
    pub fn new(phase: Phase, file: Option<String>, message: impl Into<String>) -> Self {
        Self {
            phase,
            file,
            message: message.into(),
            stack: None,
        }
    }

    /// 与文件无关的错误（视图不存在、输出失败等）
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(Phase::Other, None, message)
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// 获取错误阶段
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 获取出错文件（如果有）
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取调用栈（仅执行阶段）
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// 转换为结构化错误报告
    ///
    /// CLI 可以直接打印，上层应用可以序列化为 JSON。
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            phase: self.phase.as_str(),
            file: self.file.clone(),
            message: self.message.clone(),
            stack: self.stack.clone(),
        }
    }
}

impl From<RenderError> for WaxError {
    fn from(err: RenderError) -> Self {
        Self {
            phase: err.phase,
            file: err.file,
            message: err.message,
            stack: err.stack,
        }
    }
}

/// 结构化错误报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// 错误阶段: load, compile, execute, other
    pub phase: &'static str,
    /// 出错文件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 人类可读的错误消息
    pub message: String,
    /// 调用栈
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wax error [{}]: {}{}",
            self.phase,
            file_prefix(&self.file),
            self.message
        )?;
        if let Some(stack) = &self.stack {
            for line in stack.lines() {
                write!(f, "\n    {}", line)?;
            }
        }
        Ok(())
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"phase":"{}","message":"unserializable error"}}"#, self.phase)
        })
    }

    /// 简洁格式（适合终端）
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_file() {
        let err = WaxError::new(Phase::Load, Some("/View.jsx".to_string()), "error on lines 2:4");
        assert_eq!(err.to_string(), "wax error [load]: '/View.jsx': error on lines 2:4");
    }

    #[test]
    fn test_display_without_file() {
        let err = WaxError::other("view 'Missing' not found");
        assert_eq!(err.to_string(), "wax error [other]: view 'Missing' not found");
        assert_eq!(err.file(), None);
    }

    #[test]
    fn test_from_render_error() {
        let err: WaxError = RenderError::execute(
            "/View.jsx",
            "boom",
            Some("at file:///View.jsx?ts=1".to_string()),
        )
        .into();
        assert_eq!(err.phase(), Phase::Execute);
        assert_eq!(err.file(), Some("/View.jsx"));
        assert_eq!(err.message(), "boom");
        assert_eq!(err.stack(), Some("at file:///View.jsx?ts=1"));
    }

    #[test]
    fn test_report_display() {
        let report = WaxError::new(Phase::Execute, Some("/a.jsx".to_string()), "boom")
            .with_stack("at file:///a.jsx?ts=2")
            .to_report();
        assert_eq!(
            report.to_string(),
            "wax error [execute]: '/a.jsx': boom\n    at file:///a.jsx?ts=2"
        );
        assert_eq!(report.to_short(), "execute: boom");
    }

    #[test]
    fn test_report_to_json() {
        let report = WaxError::new(Phase::Compile, Some("/a.jsx".to_string()), "bad \"token\"")
            .to_report();
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["phase"], "compile");
        assert_eq!(json["file"], "/a.jsx");
        assert_eq!(json["message"], "bad \"token\"");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn test_report_to_json_without_file() {
        let json = WaxError::other("x").to_report().to_json();
        assert_eq!(json, r#"{"phase":"other","message":"x"}"#);
    }
}
