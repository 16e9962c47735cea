//! Wax - server-side JSX/TSX view engine
//!
//! Wax compiles component views written in JSX/TSX into scripts, links them
//! into a per-render module graph inside an embedded sandbox, and writes the
//! result as escaped HTML.
//!
//! # Architecture
//!
//! ```text
//! wax-config/  - Configuration data (EngineConfig, LimitConfig, Phase)
//! wax-log/     - Structured logging with per-phase targets
//! wax-vfs/     - Virtual file system (memory / native) with version tags
//! wax-core/    - Clause parser, rewriter, module cache, linker, HTML writer
//! wax-api/     - Engine facade and unified errors
//! wax-cli/     - `wax` binary
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use wax_workspace::{memory_engine, HostValue};
//!
//! let (engine, _fs) = memory_engine(&[("/Hello.jsx", "export function Hello(m) { return <p>{m.name}</p> }")]);
//! let html = engine.render_to_string("Hello", &serde_json::json!({ "name": "wax" }).into())?;
//! assert_eq!(html, "<p>wax</p>");
//! ```

use std::path::PathBuf;
use std::sync::Arc;

pub use wax_api::{
    get_config, init_config, is_initialized, Engine, EngineConfig, ErrorReport, FsViewResolver,
    HostFunction, HostValue, LimitConfig, ModuleId, Phase, RenderOptions, RunConfig,
    ViewResolver, WaxError,
};
pub use wax_vfs::{MemoryFileSystem, NativeFileSystem, VirtualFileSystem};

pub use wax_api;
pub use wax_config;
pub use wax_core;
pub use wax_log;
pub use wax_vfs;

/// 以磁盘目录为视图根的引擎
pub fn native_engine(root: impl Into<PathBuf>, config: EngineConfig) -> Engine {
    let fs = Arc::new(NativeFileSystem::with_base(root));
    let resolver = FsViewResolver::new(fs).with_extensions(config.extensions.clone());
    Engine::new(Arc::new(resolver), config)
}

/// 以内存文件为视图源的引擎，返回文件系统以便修改文件
pub fn memory_engine(files: &[(&str, &str)]) -> (Engine, Arc<MemoryFileSystem>) {
    let fs = Arc::new(MemoryFileSystem::with_files(
        files.iter().map(|(path, content)| (*path, content.as_bytes().to_vec())),
    ));
    let engine = Engine::new(
        Arc::new(FsViewResolver::new(fs.clone())),
        EngineConfig::default(),
    );
    (engine, fs)
}
