//! 模块系统
//!
//! - [`id`]：规范模块标识（路径 + 版本）
//! - [`resolver`]：视图名与相对 import 路径的解析
//! - [`loader`]：改写、包装、校验并缓存编译产物

pub mod id;
pub mod loader;
pub mod resolver;

pub use id::ModuleId;
pub use loader::{LoadError, LoadResult, Program, ProgramCache};
pub use resolver::{FsViewResolver, ResolveError, ResolveResult, ViewResolver};
