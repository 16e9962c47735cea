//! 编译缓存与加载器
//!
//! `load` 在读锁下查缓存；未命中时在锁外读取、改写、包装并校验，
//! 再在写锁下插入。两个并发的未命中可能各编译一次，结果相同，后者覆盖前者。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use boa_interner::Interner;
use boa_parser::{Parser, Source};
use thiserror::Error;
use wax_config::Phase;
use wax_log::Logger;

use super::id::ModuleId;
use super::resolver::{ResolveError, ViewResolver};
use crate::compiler::rewriter::{rewrite, RewriteError};

/// 加载错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// 解析器读取失败，原样传播
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// 改写失败
    #[error("{source}")]
    Rewrite {
        file: String,
        #[source]
        source: RewriteError,
    },

    /// 沙箱语法校验失败
    #[error("{message}")]
    Compile { file: String, message: String },
}

impl LoadError {
    pub fn phase(&self) -> Phase {
        match self {
            LoadError::Resolve(_) | LoadError::Rewrite { .. } => Phase::Load,
            LoadError::Compile { .. } => Phase::Compile,
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            LoadError::Resolve(e) => e.file(),
            LoadError::Rewrite { file, .. } | LoadError::Compile { file, .. } => Some(file),
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

/// 编译产物
///
/// 脚本是一个以模块记录为参数的函数表达式，首行没有额外换行，
/// 因此脚本第 N 行就是源码第 N 行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub id: ModuleId,
    pub script: String,
    pub warnings: Vec<String>,
    /// 脚本会 `do_import` 的说明符
    pub imports: Vec<String>,
}

impl Program {
    /// 包装改写结果
    pub fn wrap(id: ModuleId, rewritten: &str, warnings: Vec<String>) -> Self {
        Self {
            id,
            script: format!("(function (module) {{ \"use strict\"; {}\n}})", rewritten),
            warnings,
            imports: Vec::new(),
        }
    }

    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }
}

/// 缓存键：解析器命名空间 + 模块标识
type CacheKey = (String, ModuleId);

/// 全局编译缓存，跨渲染共享
///
/// 同一个缓存可以服务多个解析器，键中带有 [`ViewResolver::namespace`]。
pub struct ProgramCache {
    programs: RwLock<HashMap<CacheKey, Arc<Program>>>,
    compiles: AtomicUsize,
    logger: Arc<Logger>,
}

impl ProgramCache {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            programs: RwLock::new(HashMap::new()),
            compiles: AtomicUsize::new(0),
            logger,
        }
    }

    /// 取得编译产物，必要时编译
    pub fn load(&self, id: &ModuleId, resolver: &dyn ViewResolver) -> LoadResult<Arc<Program>> {
        let key = (resolver.namespace(), id.clone());
        if let Some(program) = self.get(&key) {
            wax_log::trace!(self.logger, target: "wax::load", "cache hit: {}", id.url());
            return Ok(program);
        }

        let program = Arc::new(self.compile(id, resolver)?);

        let mut programs = self
            .programs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        programs.insert(key, program.clone());
        Ok(program)
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<Program>> {
        let programs = self
            .programs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        programs.get(key).cloned()
    }

    fn compile(&self, id: &ModuleId, resolver: &dyn ViewResolver) -> LoadResult<Program> {
        let source = resolver.get_content(id)?;

        let rewritten = rewrite(&id.path, &source).map_err(|source| LoadError::Rewrite {
            file: id.path.clone(),
            source,
        })?;
        for warning in &rewritten.warnings {
            wax_log::warn!(self.logger, target: "wax::load", "{}", warning);
        }

        let program = Program::wrap(id.clone(), &rewritten.script, rewritten.warnings)
            .with_imports(rewritten.imports);
        validate(&program.script).map_err(|message| LoadError::Compile {
            file: id.path.clone(),
            message,
        })?;

        self.compiles.fetch_add(1, Ordering::Relaxed);
        wax_log::debug!(
            self.logger,
            target: "wax::compile",
            "compiled {} ({} bytes)",
            id.url(),
            program.script.len()
        );
        Ok(program)
    }

    /// 累计编译次数
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.programs
            .read()
            .map(|programs| programs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &ModuleId, resolver: &dyn ViewResolver) -> bool {
        self.get(&(resolver.namespace(), id.clone())).is_some()
    }

    pub fn clear(&self) {
        let mut programs = self
            .programs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        programs.clear();
    }
}

impl std::fmt::Debug for ProgramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCache")
            .field("len", &self.len())
            .field("compiles", &self.compile_count())
            .finish()
    }
}

/// 用沙箱的解析器校验脚本
fn validate(script: &str) -> Result<(), String> {
    let mut interner = Interner::default();
    Parser::new(Source::from_bytes(script))
        .parse_script(&mut interner)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::module::FsViewResolver;
    use std::path::Path;
    use wax_vfs::{MemoryFileSystem, VirtualFileSystem};

    fn setup(files: &[(&str, &str)]) -> (Arc<MemoryFileSystem>, FsViewResolver, ProgramCache) {
        let fs = Arc::new(MemoryFileSystem::with_files(files.iter().copied()));
        let resolver = FsViewResolver::new(fs.clone());
        (fs, resolver, ProgramCache::new(Logger::noop()))
    }

    #[test]
    fn test_program_wrap_keeps_lines() {
        let program = Program::wrap(ModuleId::new("/a.jsx", 1), "a;\nb;", Vec::new());
        assert!(program.script.starts_with("(function (module) { \"use strict\"; a;"));
        assert_eq!(program.script.lines().nth(1), Some("b;"));
    }

    #[test]
    fn test_cache_hit_does_not_recompile() {
        let (_, resolver, cache) = setup(&[("/View.jsx", "export function View() { return 1 }")]);
        let id = resolver.resolve_view("View").unwrap();

        let first = cache.load(&id, &resolver).unwrap();
        let second = cache.load(&id, &resolver).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&id, &resolver));
    }

    #[test]
    fn test_resolvers_do_not_share_entries() {
        let cache = ProgramCache::new(Logger::noop());
        let first = FsViewResolver::new(Arc::new(MemoryFileSystem::with_files([(
            "/View.jsx",
            "export const who = 'first'",
        )])));
        let second = FsViewResolver::new(Arc::new(MemoryFileSystem::with_files([(
            "/View.jsx",
            "export const who = 'second'",
        )])));
        let a = first.resolve_view("View").unwrap();
        let b = second.resolve_view("View").unwrap();
        assert_eq!(a, b);

        assert!(cache.load(&a, &first).unwrap().script.contains("'first'"));
        assert!(cache.load(&b, &second).unwrap().script.contains("'second'"));
        assert!(cache.load(&a, &first).unwrap().script.contains("'first'"));
        assert_eq!(cache.compile_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_program_records_imports() {
        let (_, resolver, cache) = setup(&[(
            "/View.jsx",
            "import { a } from './a';\nexport * from './b';\nexport const c = a;",
        )]);
        let id = resolver.resolve_view("View").unwrap();
        let program = cache.load(&id, &resolver).unwrap();
        assert_eq!(program.imports, vec!["./a", "./b"]);
    }

    #[test]
    fn test_new_version_is_new_entry() {
        let (fs, resolver, cache) = setup(&[
            ("/View.jsx", "export const a = 1"),
            ("/Other.jsx", "export const b = 2"),
        ]);
        let view = resolver.resolve_view("View").unwrap();
        let other = resolver.resolve_view("Other").unwrap();
        cache.load(&view, &resolver).unwrap();
        cache.load(&other, &resolver).unwrap();

        fs.write_file(Path::new("/View.jsx"), b"export const a = 3").unwrap();
        let edited = resolver.resolve_view("View").unwrap();
        let program = cache.load(&edited, &resolver).unwrap();
        assert!(program.script.contains("= 3"));

        // 未修改的模块仍然命中
        cache.load(&other, &resolver).unwrap();
        assert_eq!(cache.compile_count(), 3);
    }

    #[test]
    fn test_rewrite_error_is_load_phase() {
        let (_, resolver, cache) = setup(&[("/Bad.jsx", "const a = <img>x</img>;")]);
        let id = resolver.resolve_view("Bad").unwrap();
        let err = cache.load(&id, &resolver).unwrap_err();
        assert_eq!(err.phase(), Phase::Load);
        assert_eq!(err.file(), Some("/Bad.jsx"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_compile_error_is_compile_phase() {
        // tree-sitter 接受但严格模式下非法
        let (_, resolver, cache) = setup(&[("/Bad.jsx", "with (a) { b }")]);
        let id = resolver.resolve_view("Bad").unwrap();
        let err = cache.load(&id, &resolver).unwrap_err();
        assert_eq!(err.phase(), Phase::Compile);
        assert_eq!(err.file(), Some("/Bad.jsx"));
    }

    #[test]
    fn test_read_error_propagates() {
        let (_, resolver, cache) = setup(&[]);
        let err = cache
            .load(&ModuleId::new("/Gone.jsx", 1), &resolver)
            .unwrap_err();
        assert!(matches!(err, LoadError::Resolve(ResolveError::Read { .. })));
    }

    #[test]
    fn test_clear() {
        let (_, resolver, cache) = setup(&[("/View.jsx", "1")]);
        let id = resolver.resolve_view("View").unwrap();
        cache.load(&id, &resolver).unwrap();
        cache.clear();
        assert!(!cache.contains(&id, &resolver));
        cache.load(&id, &resolver).unwrap();
        assert_eq!(cache.compile_count(), 2);
    }
}
