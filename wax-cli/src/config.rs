//! CLI 配置
//!
//! 项目文件（wax.json）结构，以及按阶段划分的日志配置

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::Level;
use wax_config::{EngineConfig, LimitConfig};

/// wax.json 结构
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// 视图根目录（相对项目文件所在目录）
    #[serde(default = "default_root")]
    pub root: String,
    /// 默认渲染的视图
    pub view: Option<String>,
    /// 每次渲染前执行的脚本
    #[serde(default)]
    pub global_scripts: Vec<String>,
    /// 内联模型
    pub model: Option<serde_json::Value>,
    /// 日志级别
    #[serde(default)]
    pub log: ProjectLog,
    /// 候选扩展名
    pub extensions: Option<Vec<String>>,
    /// 最大 import 嵌套深度
    pub max_import_depth: Option<usize>,
}

fn default_root() -> String {
    String::from(".")
}

/// 项目文件中的日志配置: "error", "warn", "info", "debug", "trace"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectLog {
    pub level: Option<String>,
    pub load: Option<String>,
    pub compile: Option<String>,
    pub execute: Option<String>,
}

impl ProjectFile {
    /// 读取并解析项目文件
    pub fn read(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("invalid '{}': {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// 视图根目录，相对路径以项目文件所在目录为基准
    pub fn root_dir(&self, project_path: &Path) -> PathBuf {
        let base = project_path.parent().unwrap_or(Path::new("."));
        base.join(&self.root)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            global_scripts: self.global_scripts.clone(),
            extensions: self.extensions.clone().unwrap_or(defaults.extensions),
            limits: LimitConfig {
                max_import_depth: self
                    .max_import_depth
                    .unwrap_or(defaults.limits.max_import_depth),
            },
        }
    }

    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::default();
        if let Some(level) = self.log.level.as_deref().and_then(parse_log_level) {
            config.global = level;
        }
        config.load = self.log.load.as_deref().and_then(parse_log_level);
        config.compile = self.log.compile.as_deref().and_then(parse_log_level);
        config.execute = self.log.execute.as_deref().and_then(parse_log_level);
        config
    }
}

/// CLI 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub load: Option<Level>,
    pub compile: Option<Level>,
    pub execute: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            load: None,
            compile: None,
            execute: None,
        }
    }
}

impl LogConfig {
    /// Get log level for a specific target
    pub fn level_for(&self, target: &str) -> Level {
        match target {
            "wax::load" => self.load.unwrap_or(self.global),
            "wax::compile" => self.compile.unwrap_or(self.global),
            "wax::execute" => self.execute.unwrap_or(self.global),
            _ => self.global,
        }
    }

    /// 最详细的级别，用于设置 wax-log 的过滤下限
    pub fn most_verbose(&self) -> Level {
        [self.load, self.compile, self.execute]
            .into_iter()
            .flatten()
            .fold(self.global, |acc, level| acc.max(level))
    }
}

/// Parse log level string
pub fn parse_log_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project() {
        let project = ProjectFile::parse(r#"{ "view": "Home" }"#).unwrap();
        assert_eq!(project.root, ".");
        assert_eq!(project.view.as_deref(), Some("Home"));
        assert_eq!(project.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_parse_full_project() {
        let project = ProjectFile::parse(
            r#"{
                "root": "views",
                "view": "Home",
                "globalScripts": ["./globals.jsx"],
                "model": { "title": "x" },
                "log": { "level": "info", "compile": "trace" },
                "extensions": [".jsx"],
                "maxImportDepth": 8
            }"#,
        )
        .unwrap();
        let engine = project.engine_config();
        assert_eq!(engine.global_scripts, vec!["./globals.jsx"]);
        assert_eq!(engine.extensions, vec![".jsx"]);
        assert_eq!(engine.limits.max_import_depth, 8);
        assert_eq!(project.model.as_ref().unwrap()["title"], "x");
        assert_eq!(
            project.root_dir(Path::new("/srv/site/wax.json")),
            PathBuf::from("/srv/site/views")
        );

        let log = project.log_config();
        assert_eq!(log.global, Level::INFO);
        assert_eq!(log.level_for("wax::compile"), Level::TRACE);
        assert_eq!(log.level_for("wax::load"), Level::INFO);
        assert_eq!(log.most_verbose(), Level::TRACE);
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_log_level("loud"), None);
    }
}
