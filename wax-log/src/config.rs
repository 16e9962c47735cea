//! 日志器组装

use std::path::PathBuf;
use std::sync::Arc;

use wax_config::Phase;

use crate::{Level, LogRingBuffer, Logger};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputConfig {
    #[cfg(feature = "stderr")]
    Stderr,
    #[cfg(feature = "file")]
    File(PathBuf),
    /// 容量
    RingBuffer(usize),
}

/// 一次性描述日志器：默认级别、各阶段级别和输出目标
///
/// ```
/// use wax_config::Phase;
/// use wax_log::{Level, LogConfig};
///
/// let (logger, ring) = LogConfig::new(Level::Warn)
///     .with_phase(Phase::Compile, Level::Debug)
///     .with_ring_buffer(256)
///     .init();
/// assert!(ring.is_some());
/// assert!(logger.is_enabled_for("wax::compile", Level::Debug));
/// assert!(!logger.is_enabled_for("wax::load", Level::Debug));
/// ```
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: Level,
    pub targets: Vec<(String, Level)>,
    pub outputs: Vec<OutputConfig>,
}

impl LogConfig {
    pub fn new(level: Level) -> Self {
        LogConfig {
            level,
            targets: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// 测试用：静默
    pub fn test() -> Self {
        LogConfig::new(Level::Error)
    }

    /// 解析 `warn,wax::compile=debug` 形式的过滤串
    pub fn parse_filter(filter: &str) -> crate::Result<Self> {
        let mut config = LogConfig::new(Level::Info);
        for item in filter.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once('=') {
                Some((target, level)) => config
                    .targets
                    .push((target.trim().to_string(), level.trim().parse()?)),
                None => config.level = item.parse()?,
            }
        }
        Ok(config)
    }

    pub fn with_phase(self, phase: Phase, level: Level) -> Self {
        self.with_target_level(phase.target(), level)
    }

    pub fn with_target_level(mut self, target: impl Into<String>, level: Level) -> Self {
        self.targets.push((target.into(), level));
        self
    }

    #[cfg(feature = "stderr")]
    pub fn with_stderr(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stderr) {
            self.outputs.push(OutputConfig::Stderr);
        }
        self
    }

    #[cfg(feature = "file")]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(OutputConfig::File(path.into()));
        self
    }

    pub fn with_ring_buffer(mut self, capacity: usize) -> Self {
        self.outputs.push(OutputConfig::RingBuffer(capacity));
        self
    }

    /// 构造日志器，同时返回最后一个环形缓冲区
    ///
    /// 打不开的日志文件被跳过。
    pub fn init(self) -> (Arc<Logger>, Option<Arc<LogRingBuffer>>) {
        let logger = Logger::new(self.level);
        for (target, level) in self.targets {
            logger.set_target_level(target, level);
        }

        let mut ring = None;
        for output in self.outputs {
            match output {
                #[cfg(feature = "stderr")]
                OutputConfig::Stderr => logger.add_sink(crate::StderrSink),
                #[cfg(feature = "file")]
                OutputConfig::File(path) => {
                    if let Ok(sink) = crate::FileSink::new(&path) {
                        logger.add_sink(sink);
                    }
                }
                OutputConfig::RingBuffer(capacity) => {
                    let buffer = LogRingBuffer::new(capacity);
                    logger.add_sink(buffer.clone());
                    ring = Some(buffer);
                }
            }
        }

        (logger, ring)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::new(Level::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let config = LogConfig::parse_filter("warn, wax::compile=debug,wax::execute=trace").unwrap();
        assert_eq!(config.level, Level::Warn);
        assert_eq!(
            config.targets,
            vec![
                ("wax::compile".to_string(), Level::Debug),
                ("wax::execute".to_string(), Level::Trace),
            ]
        );
        assert!(LogConfig::parse_filter("wax::load=chatty").is_err());
        assert_eq!(LogConfig::parse_filter("").unwrap().level, Level::Info);
    }

    #[test]
    fn test_init_applies_phase_levels() {
        let (logger, ring) = LogConfig::test()
            .with_phase(Phase::Load, Level::Debug)
            .with_ring_buffer(10)
            .init();
        let ring = ring.unwrap();

        crate::debug!(logger, target: "wax::load", "resolved /View.jsx");
        crate::debug!(logger, target: "wax::compile", "hidden");

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.phase_records(Phase::Load).len(), 1);
    }

    #[test]
    fn test_init_without_ring_buffer() {
        let (logger, ring) = LogConfig::new(Level::Debug).init();
        assert!(ring.is_none());
        crate::debug!(logger, "no sink");
    }

    #[cfg(feature = "stderr")]
    #[test]
    fn test_with_stderr_once() {
        let config = LogConfig::default().with_stderr().with_stderr();
        assert_eq!(config.outputs, vec![OutputConfig::Stderr]);
    }

    #[cfg(feature = "file")]
    #[test]
    fn test_unopenable_file_is_skipped() {
        let blocker = std::env::temp_dir().join(format!("wax_log_cfg_{}", std::process::id()));
        std::fs::write(&blocker, "not a directory").unwrap();

        let (logger, _) = LogConfig::new(Level::Debug)
            .with_file(blocker.join("render.log"))
            .init();
        crate::debug!(logger, "dropped");

        std::fs::remove_file(&blocker).ok();
    }
}
