//! 重写错误

use crate::compiler::clause::ClauseError;
use thiserror::Error;

/// 重写阶段的错误，全部归入 Load 阶段
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// 语法树整体无法成形
    #[error("syntax error: unexpected end of input")]
    UnexpectedEnd,
    /// 语法错误所在的行（从 1 开始）
    #[error("error on lines {start}:{end}")]
    Syntax { start: usize, end: usize },
    /// 明确不支持的语法
    #[error("unsupported syntax: {0}")]
    Unsupported(String),
    /// void 元素带有子节点
    #[error("invalid: void element with child")]
    VoidElementChild { tag: String, line: usize },
    /// textarea 带有文本或元素子节点
    #[error("textarea should not have child. Use value attribute.")]
    TextareaChild { line: usize },
    /// import / export 子句无法解析
    #[error("invalid module clause on line {line}: {source}")]
    Clause { line: usize, source: ClauseError },
    /// 语法解析器初始化失败
    #[error("failed to load TSX grammar: {0}")]
    Grammar(String),
    /// 解析器没有返回语法树
    #[error("parser produced no syntax tree")]
    NoTree,
}

pub type RewriteResult<T> = Result<T, RewriteError>;
