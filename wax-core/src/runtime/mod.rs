//! 运行时
//!
//! - [`writer`]：与沙箱无关的 HTML 写入规则
//! - [`bridge`]：写入器对象与 `wax` 辅助对象
//! - [`value`]：宿主值与脚本值之间的转换
//! - [`linker`]：单次渲染的模块链接与视图调用

pub mod bridge;
pub mod linker;
pub mod value;
pub mod writer;

pub use linker::{Linker, RenderRequest};
pub use value::{HostFunction, HostValue};
pub use writer::{Host, HtmlWriter, ValueKind};
