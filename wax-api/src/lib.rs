//! Wax API - Engine facade
//!
//! Provides the unified rendering interface, including:
//! - Engine construction (global scripts, global objects, logger)
//! - Rendering into any `io::Write` sink
//! - Unified error handling (WaxError)
//!
//! For CLI convenience, this crate provides a process-wide RunConfig cell.
//! For library use, prefer constructing an [`Engine`] explicitly.

use std::io;
use std::sync::Arc;

use wax_core::{Linker, ProgramCache, RenderRequest};
use wax_log::{info, Logger};

// Re-export config
pub mod config;
pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};

// Re-export error and types
pub mod error;
pub mod types;
pub use error::{ErrorReport, WaxError};
pub use types::RenderOptions;

// Re-export core types
pub use wax_config::{self, EngineConfig, LimitConfig, Phase};
pub use wax_core::{FsViewResolver, HostFunction, HostValue, ModuleId, ViewResolver};

/// 视图引擎
///
/// 构造后配置不可变；可在多个线程间共享，每次渲染使用独立的沙箱。
pub struct Engine {
    resolver: Arc<dyn ViewResolver>,
    config: EngineConfig,
    globals: Vec<(String, HostValue)>,
    logger: Arc<Logger>,
    linker: Linker,
}

impl Engine {
    pub fn new(resolver: Arc<dyn ViewResolver>, config: EngineConfig) -> Self {
        Self::assemble(resolver, config, Vec::new(), Logger::noop())
    }

    /// 使用全局 RunConfig 构造
    pub fn from_run_config(resolver: Arc<dyn ViewResolver>, run: &RunConfig) -> Self {
        Self::assemble(resolver, run.engine.clone(), Vec::new(), run.logger.clone())
    }

    fn assemble(
        resolver: Arc<dyn ViewResolver>,
        config: EngineConfig,
        globals: Vec<(String, HostValue)>,
        logger: Arc<Logger>,
    ) -> Self {
        let cache = Arc::new(ProgramCache::new(logger.clone()));
        let linker = Linker::new(cache, config.clone(), globals.clone(), logger.clone());
        Self {
            resolver,
            config,
            globals,
            logger,
            linker,
        }
    }

    fn relink(self) -> Self {
        Self::assemble(self.resolver, self.config, self.globals, self.logger)
    }

    /// 追加一个每次渲染都在主模块之前执行的脚本（相对主模块解析）
    pub fn with_global_script(mut self, path: impl Into<String>) -> Self {
        self.config.global_scripts.push(path.into());
        self.relink()
    }

    /// 追加一个引擎级全局值
    pub fn with_global_object(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.globals.push((name.into(), value.into()));
        self.relink()
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self.relink()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 编译缓存，供检查使用
    pub fn cache(&self) -> &Arc<ProgramCache> {
        self.linker.cache()
    }

    /// 渲染视图并写入 `out`
    pub fn render(
        &self,
        out: &mut impl io::Write,
        view: &str,
        model: &HostValue,
    ) -> Result<(), WaxError> {
        self.render_with(out, view, model, &RenderOptions::default())
    }

    /// 带渲染级全局值或替换解析器的渲染
    pub fn render_with(
        &self,
        out: &mut impl io::Write,
        view: &str,
        model: &HostValue,
        options: &RenderOptions,
    ) -> Result<(), WaxError> {
        let html = self.render_string_with(view, model, options)?;
        out.write_all(html.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| WaxError::other(format!("failed to write output: {}", e)))
    }

    /// 渲染视图并返回 HTML
    pub fn render_to_string(&self, view: &str, model: &HostValue) -> Result<String, WaxError> {
        self.render_string_with(view, model, &RenderOptions::default())
    }

    fn render_string_with(
        &self,
        view: &str,
        model: &HostValue,
        options: &RenderOptions,
    ) -> Result<String, WaxError> {
        let resolver = options
            .resolver
            .clone()
            .unwrap_or_else(|| self.resolver.clone());
        let html = self.linker.render(&RenderRequest {
            view,
            model,
            globals: &options.globals,
            resolver,
        })?;
        info!(self.logger, target: "wax::execute", "rendered '{}' ({} bytes)", view, html.len());
        Ok(html)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.globals.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("globals", &names)
            .field("cache", self.linker.cache())
            .finish()
    }
}
