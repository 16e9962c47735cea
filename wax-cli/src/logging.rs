//! CLI 日志系统初始化
//!
//! 基于 `tracing-subscriber` 实现分阶段日志控制，引擎的 wax-log 记录
//! 通过 [`TracingSink`] 转发为 tracing 事件。

use std::io;
use std::sync::Arc;

use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};
use wax_log::{LogRingBuffer, LogSink, Logger, Record};

use crate::config::LogConfig;

/// 日志输出格式
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// 彩色格式化（开发使用）
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式（工具集成）
    Json,
}

/// 使用指定格式和日志配置初始化日志系统，日志写到 stderr
pub fn init(log_config: &LogConfig, format: LogFormat) {
    let targets = Targets::new()
        .with_default(log_config.global)
        .with_target("wax::load", log_config.level_for("wax::load"))
        .with_target("wax::compile", log_config.level_for("wax::compile"))
        .with_target("wax::execute", log_config.level_for("wax::execute"))
        .with_target("wax::cli", log_config.global);

    let layer = create_format_layer(format, io::stderr).with_filter(targets);
    // 已有全局 subscriber 时保留原有的
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

/// Create formatter layer based on format
fn create_format_layer<W, F>(format: LogFormat, make_writer: F) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
    }
}

/// 最近记录的保留条数，渲染失败时转储
const CRASH_DUMP_RECORDS: usize = 64;

/// 引擎使用的 wax-log 日志器：记录转发给 tracing，同时留在环形缓冲区
pub fn engine_logger(log_config: &LogConfig) -> (Arc<Logger>, Arc<LogRingBuffer>) {
    let ring = LogRingBuffer::new(CRASH_DUMP_RECORDS);
    let logger = Logger::new(to_wax_level(log_config.most_verbose()))
        .with_sink(TracingSink)
        .with_sink(ring.clone());
    (logger, ring)
}

fn to_wax_level(level: tracing::Level) -> wax_log::Level {
    if level == tracing::Level::TRACE {
        wax_log::Level::Trace
    } else if level == tracing::Level::DEBUG {
        wax_log::Level::Debug
    } else if level == tracing::Level::INFO {
        wax_log::Level::Info
    } else if level == tracing::Level::WARN {
        wax_log::Level::Warn
    } else {
        wax_log::Level::Error
    }
}

/// tracing 的 target 必须是常量，按已知阶段分派
macro_rules! forward {
    ($record:expr, $target:literal) => {
        match $record.level {
            wax_log::Level::Trace => tracing::trace!(target: $target, "{}", $record.message),
            wax_log::Level::Debug => tracing::debug!(target: $target, "{}", $record.message),
            wax_log::Level::Info => tracing::info!(target: $target, "{}", $record.message),
            wax_log::Level::Warn => tracing::warn!(target: $target, "{}", $record.message),
            wax_log::Level::Error => tracing::error!(target: $target, "{}", $record.message),
        }
    };
}

/// 把 wax-log 记录转发为 tracing 事件
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, record: &Record) {
        match record.target {
            "wax::load" => forward!(record, "wax::load"),
            "wax::compile" => forward!(record, "wax::compile"),
            "wax::execute" => forward!(record, "wax::execute"),
            _ => forward!(record, "wax::cli"),
        }
    }
}
