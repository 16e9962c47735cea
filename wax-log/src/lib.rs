//! wax-log - 渲染阶段日志
//!
//! - 无全局 logger：`Arc<Logger>` 由引擎构造时传入缓存和链接器
//! - 按阶段过滤：`wax::load`、`wax::compile`、`wax::execute` 各自设置级别
//! - 环形缓冲区保留最近的记录，渲染失败后可以转储
//!
//! ```ignore
//! use wax_log::{debug, LogConfig};
//!
//! let (logger, ring) = LogConfig::default().with_ring_buffer(1024).init();
//! debug!(logger, target: "wax::load", "render view '{}'", "Home");
//! ```

mod config;
mod logger;
mod macros;
mod record;
mod ring_buffer;

pub use config::{LogConfig, OutputConfig};
#[cfg(feature = "file")]
pub use logger::FileSink;
#[cfg(feature = "stderr")]
pub use logger::StderrSink;
pub use logger::{LogSink, Logger};
pub use record::{Level, Record};
pub use ring_buffer::{LogRingBuffer, RingBufferStats};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}
