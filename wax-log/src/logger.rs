//! 日志器与输出目标

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use wax_config::Phase;

use crate::record::{Level, Record};

/// 日志输出目标
pub trait LogSink: Send + Sync {
    fn write(&self, record: &Record);
}

/// 引擎日志器
///
/// 通过 `Arc<Logger>` 显式传给缓存、链接器和引擎；没有全局实例。
/// 每个 target 前缀可以单独设置级别，最长的匹配前缀生效。
pub struct Logger {
    level: AtomicU8,
    overrides: RwLock<Vec<(String, Level)>>,
    sinks: Mutex<Vec<Box<dyn LogSink>>>,
}

impl Logger {
    pub fn new(level: Level) -> Arc<Self> {
        Arc::new(Logger {
            level: AtomicU8::new(level.to_bits()),
            overrides: RwLock::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
        })
    }

    /// 只记录 Error 且没有输出目标
    pub fn noop() -> Arc<Self> {
        Self::new(Level::Error)
    }

    pub fn with_sink<S: LogSink + 'static>(self: Arc<Self>, sink: S) -> Arc<Self> {
        self.add_sink(sink);
        self
    }

    pub fn add_sink<S: LogSink + 'static>(&self, sink: S) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(Box::new(sink));
        }
    }

    /// 单独设置某个渲染阶段的级别
    ///
    /// ```ignore
    /// let logger = Logger::new(Level::Warn).with_phase_level(Phase::Compile, Level::Debug);
    /// ```
    pub fn with_phase_level(self: Arc<Self>, phase: Phase, level: Level) -> Arc<Self> {
        self.set_target_level(phase.target(), level);
        self
    }

    pub fn with_target_level(self: Arc<Self>, target: impl Into<String>, level: Level) -> Arc<Self> {
        self.set_target_level(target, level);
        self
    }

    /// 覆盖已有设置
    pub fn set_target_level(&self, target: impl Into<String>, level: Level) {
        let target = target.into();
        if let Ok(mut overrides) = self.overrides.write() {
            overrides.retain(|(existing, _)| *existing != target);
            overrides.push((target, level));
        }
    }

    pub fn level(&self) -> Level {
        Level::from_bits(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn effective_level(&self, target: &str) -> Level {
        let default = self.level();
        let Ok(overrides) = self.overrides.read() else {
            return default;
        };
        overrides
            .iter()
            .filter(|(prefix, _)| covers(prefix, target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(default, |(_, level)| *level)
    }

    pub fn is_enabled_for(&self, target: &str, level: Level) -> bool {
        level >= self.effective_level(target)
    }

    /// 分发一条记录；宏在格式化前已检查过级别
    #[inline(never)]
    pub fn log(&self, level: Level, target: &'static str, message: impl Into<String>) {
        if !self.is_enabled_for(target, level) {
            return;
        }
        let record = Record::new(level, target, message);
        if let Ok(sinks) = self.sinks.lock() {
            for sink in sinks.iter() {
                sink.write(&record);
            }
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let overrides = self
            .overrides
            .read()
            .map(|o| o.clone())
            .unwrap_or_default();
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("overrides", &overrides)
            .finish_non_exhaustive()
    }
}

/// `wax::load` 覆盖 `wax::load` 和 `wax::load::cache`，不覆盖 `wax::loader`
fn covers(prefix: &str, target: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[cfg(feature = "stderr")]
pub struct StderrSink;

#[cfg(feature = "stderr")]
impl LogSink for StderrSink {
    fn write(&self, record: &Record) {
        eprintln!("{}", record.format());
    }
}

/// 追加写入文件
#[cfg(feature = "file")]
pub struct FileSink {
    file: Mutex<std::fs::File>,
}

#[cfg(feature = "file")]
impl FileSink {
    pub fn new(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(FileSink {
            file: Mutex::new(file),
        })
    }
}

#[cfg(feature = "file")]
impl LogSink for FileSink {
    fn write(&self, record: &Record) {
        use std::io::Write;
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", record.format());
        }
    }
}
