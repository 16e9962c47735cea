//! 日志记录

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use wax_config::Phase;

/// 日志级别，按详细程度递减排序
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    pub(crate) const fn to_bits(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_bits(bits: u8) -> Level {
        match bits {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            _ => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::Error;

    /// 不区分大小写，`warning` 视同 `warn`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(crate::Error::UnknownLevel(s.to_string())),
        }
    }
}

/// 单条日志记录
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    /// `wax::<phase>` 或调用处模块路径
    pub target: &'static str,
    pub message: String,
}

impl Record {
    pub fn new(level: Level, target: &'static str, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            target,
            message: message.into(),
        }
    }

    /// 记录所属的渲染阶段；非 `wax` 目标返回 None
    pub fn phase(&self) -> Option<Phase> {
        Phase::from_target(self.target)
    }

    /// `12:00:01.250 DEBUG wax::compile: compiled file:///View.jsx?ts=3`
    pub fn format(&self) -> String {
        format!(
            "{} {:<5} {}: {}",
            self.time.format("%H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )
    }
}
