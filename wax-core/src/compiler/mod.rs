//! 编译器
//!
//! 子句解析、语法树改写与模块加载。

pub mod clause;
pub mod module;
pub mod rewriter;
