//! Wax Core - 视图编译与执行核心
//!
//! 包含子句解析器、语法树改写器、模块缓存与加载器、执行链接器和 HTML 写入器。
//! 文件读取通过 [`ViewResolver`] 注入，日志通过显式传入的 `Logger` 输出，
//! 不依赖任何全局状态。

pub mod compiler;
pub mod error;
pub mod runtime;

pub use compiler::clause::{parse_clause, Clause, ClauseError};
pub use compiler::module::{
    FsViewResolver, LoadError, ModuleId, Program, ProgramCache, ResolveError, ViewResolver,
};
pub use compiler::rewriter::{rewrite, RewriteError, Rewritten};
pub use error::{RenderError, RenderResult};
pub use runtime::{HostFunction, HostValue, Linker, RenderRequest};

// 配置类型来自 wax-config
pub use wax_config::{EngineConfig, LimitConfig, Phase};
