//! 测试辅助工具
//!
//! 用内存文件系统搭建渲染环境，并提供 HTML 比较辅助函数

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value as Json;
use wax_config::EngineConfig;
use wax_core::{
    FsViewResolver, HostValue, Linker, ProgramCache, RenderRequest, RenderResult, ViewResolver,
};
use wax_log::Logger;
use wax_vfs::MemoryFileSystem;

/// 一组视图文件及其渲染环境
pub struct Sample {
    pub fs: Arc<MemoryFileSystem>,
    pub resolver: Arc<dyn ViewResolver>,
    pub linker: Linker,
}

impl Sample {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_config(files, EngineConfig::default(), Vec::new())
    }

    pub fn with_config(
        files: &[(&str, &str)],
        config: EngineConfig,
        globals: Vec<(String, HostValue)>,
    ) -> Self {
        let fs = Arc::new(MemoryFileSystem::with_files(
            files.iter().map(|(path, content)| (*path, content.as_bytes().to_vec())),
        ));
        let resolver: Arc<dyn ViewResolver> = Arc::new(
            FsViewResolver::new(fs.clone()).with_extensions(config.extensions.clone()),
        );
        let logger = Logger::noop();
        let cache = Arc::new(ProgramCache::new(logger.clone()));
        let linker = Linker::new(cache, config, globals, logger);
        Self {
            fs,
            resolver,
            linker,
        }
    }

    pub fn render(&self, view: &str, model: Json) -> RenderResult<String> {
        self.render_value(view, &HostValue::Json(model))
    }

    pub fn render_value(&self, view: &str, model: &HostValue) -> RenderResult<String> {
        self.linker.render(&RenderRequest {
            view,
            model,
            globals: &[],
            resolver: self.resolver.clone(),
        })
    }
}

/// 渲染单个 `/View.jsx`
pub fn render_view(source: &str, model: Json) -> RenderResult<String> {
    Sample::new(&[("/View.jsx", source)]).render("View", model)
}

/// 规范化 HTML 空白：折叠连续空白，去掉标签之间的空白
pub fn format_html(html: &str) -> String {
    let collapsed = html.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("> <", "><").trim().to_string()
}

/// 忽略空白差异比较 HTML
pub fn assert_html(actual: &str, expected: &str) {
    assert_eq!(format_html(actual), format_html(expected));
}
