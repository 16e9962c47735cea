//! API 类型定义
//!
//! 单次渲染的可选参数。

use std::sync::Arc;

use wax_core::{HostValue, ViewResolver};

/// 单次渲染的选项
#[derive(Clone, Default)]
pub struct RenderOptions {
    /// 渲染级全局值，可覆盖引擎级同名值
    pub globals: Vec<(String, HostValue)>,
    /// 替换引擎的视图解析器
    pub resolver: Option<Arc<dyn ViewResolver>>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.globals.push((name.into(), value.into()));
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ViewResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.globals.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("RenderOptions")
            .field("globals", &names)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}
