//! API 层配置
//!
//! 包含执行配置 RunConfig 和全局单例（供 CLI 使用）

use std::sync::Arc;

use once_cell::sync::OnceCell;
use wax_config::EngineConfig;
use wax_log::Logger;

/// Execution configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Engine settings (global scripts, extensions, limits)
    pub engine: EngineConfig,
    /// Logger shared by the engine and its cache
    pub logger: Arc<Logger>,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("engine", &self.engine)
            .field("log_level", &self.logger.level())
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logger: Logger::noop(),
        }
    }
}

// Global config singleton for CLI convenience
static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();

/// Initialize global configuration
///
/// Returns the rejected config if one was already installed.
pub fn init(config: RunConfig) -> Result<(), RunConfig> {
    GLOBAL_CONFIG.set(config)
}

/// Get global config reference, if initialized
pub fn config() -> Option<&'static RunConfig> {
    GLOBAL_CONFIG.get()
}

/// Get global config, installing the default on first use
pub fn config_or_default() -> &'static RunConfig {
    GLOBAL_CONFIG.get_or_init(RunConfig::default)
}

/// Check if config is initialized
pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}
