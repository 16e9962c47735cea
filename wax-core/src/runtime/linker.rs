//! 执行链接器
//!
//! 每次渲染创建新的沙箱上下文和模块表：
//! 解析视图 → 加载主模块 → 安装全局值 → 链接模块图 → 依次执行全局脚本
//! → 执行主模块 → 选择视图函数 → 调用 → 写出结果。
//!
//! 链接在任何模块体执行之前完成：沿 import 遍历整张图，编译每个模块，
//! 在顶层求值出各自的包装函数，并解析好每个说明符。`do_import` 只调用
//! 已经求值好的包装函数，脚本运行期间不再求值新的源码。
//! 解析和加载失败记在链接表中，等到对应的 import 真正执行时才报告。
//!
//! 模块记录在模块体执行之前登记，循环 import 拿到的是尚未填充完的记录，
//! 不会重复执行。

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, Source,
};
use boa_gc::{Finalize, Trace};
use wax_config::EngineConfig;
use wax_log::Logger;

use super::bridge::{install_wax, WriterProto};
use super::value::HostValue;
use crate::compiler::module::{ModuleId, ProgramCache, ViewResolver};
use crate::error::{RenderError, RenderResult};

/// 一次渲染请求
pub struct RenderRequest<'a> {
    pub view: &'a str,
    pub model: &'a HostValue,
    /// 渲染级全局值，可覆盖引擎级同名值
    pub globals: &'a [(String, HostValue)],
    pub resolver: Arc<dyn ViewResolver>,
}

/// 执行链接器，可跨线程共享
pub struct Linker {
    cache: Arc<ProgramCache>,
    config: EngineConfig,
    globals: Vec<(String, HostValue)>,
    logger: Arc<Logger>,
}

impl Linker {
    pub fn new(
        cache: Arc<ProgramCache>,
        config: EngineConfig,
        globals: Vec<(String, HostValue)>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            cache,
            config,
            globals,
            logger,
        }
    }

    pub fn cache(&self) -> &Arc<ProgramCache> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 渲染视图，返回 HTML
    pub fn render(&self, request: &RenderRequest) -> RenderResult<String> {
        let main = request
            .resolver
            .resolve_view(request.view)
            .map_err(|e| RenderError::other(e.to_string()))?;
        wax_log::debug!(
            self.logger,
            target: "wax::load",
            "render view '{}' from {}",
            request.view,
            main.url()
        );

        self.cache.load(&main, request.resolver.as_ref())?;

        let mut ctx = Context::default();
        let state = Rc::new(RenderState {
            resolver: request.resolver.clone(),
            cache: self.cache.clone(),
            wrappers: RefCell::new(HashMap::new()),
            broken: RefCell::new(HashMap::new()),
            links: RefCell::new(HashMap::new()),
            modules: RefCell::new(HashMap::new()),
            depth: Cell::new(0),
            max_depth: self.config.limits.max_import_depth,
            failure: RefCell::new(None),
            logger: self.logger.clone(),
        });

        let result = self.link_and_invoke(&state, &main, request, &mut ctx);
        // 断开模块记录与 do_import 之间的引用环
        state.modules.borrow_mut().clear();
        state.wrappers.borrow_mut().clear();

        if let Err(err) = &result {
            wax_log::error!(
                self.logger,
                target: "wax::execute",
                "render of '{}' failed in {} phase: {}",
                request.view,
                err.phase.as_str(),
                err.message
            );
        }
        result
    }

    fn link_and_invoke(
        &self,
        state: &Rc<RenderState>,
        main: &ModuleId,
        request: &RenderRequest,
        ctx: &mut Context,
    ) -> RenderResult<String> {
        let proto = WriterProto::new(ctx);

        for (name, value) in self.globals.iter().chain(request.globals.iter()) {
            let value = value
                .to_js(ctx)
                .map_err(|e| RenderError::other(format!("global '{}': {}", name, e)))?;
            ctx.register_global_property(JsString::from(name.as_str()), value, Attribute::all())
                .map_err(|e| RenderError::other(format!("global '{}': {}", name, e)))?;
        }
        install_wax(&proto, ctx).map_err(|e| RenderError::other(e.to_string()))?;

        let mut scripts = Vec::with_capacity(self.config.global_scripts.len());
        for script in &self.config.global_scripts {
            let id = request
                .resolver
                .resolve_module(main, script)
                .map_err(|e| RenderError::load(&main.path, e.to_string()))?;
            scripts.push(id);
        }

        let roots: Vec<ModuleId> = scripts.iter().chain(std::iter::once(main)).cloned().collect();
        state.link(&roots, ctx);

        for id in &scripts {
            state
                .import(id, false, ctx)
                .map_err(|e| state.failure(e, id, ctx))?;
        }

        let module = state
            .import(main, true, ctx)
            .map_err(|e| state.failure(e, main, ctx))?;

        let view = select_view(&module, request.view, ctx)
            .map_err(|e| state.failure(e, main, ctx))?
            .ok_or_else(|| {
                RenderError::load(
                    &main.path,
                    format!("could not find function '{}'", view_function_name(request.view)),
                )
            })?;

        let model = request
            .model
            .to_js(ctx)
            .map_err(|e| state.failure(e, main, ctx))?;
        let result = view
            .call(&JsValue::undefined(), &[model], ctx)
            .map_err(|e| state.failure(e, main, ctx))?;

        let html = proto
            .drain(&result, ctx)
            .map_err(|e| state.failure(e, main, ctx))?;

        // 被脚本捕获的失败同样终止渲染
        if let Some(failure) = state.failure.borrow_mut().take() {
            return Err(failure);
        }
        Ok(html)
    }
}

/// 视图名的最后一段，去掉扩展名：`pages/Home.jsx` → `Home`
pub(crate) fn view_function_name(view: &str) -> &str {
    let base = view.rsplit('/').next().unwrap_or(view);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

/// `exports[view]`，其次 `exports[最后一段]`，否则 `default`
fn select_view(module: &JsObject, view: &str, ctx: &mut Context) -> JsResult<Option<JsObject>> {
    let exports = module.get(js_string!("exports"), ctx)?;
    if let Some(exports) = exports.as_object() {
        let short = view_function_name(view);
        let names = if short == view { vec![view] } else { vec![view, short] };
        for name in names {
            let named = exports.get(JsString::from(name), ctx)?;
            if let Some(function) = named.as_callable() {
                return Ok(Some(function.clone()));
            }
        }
    }
    let default = module.get(js_string!("default"), ctx)?;
    Ok(default.as_callable().cloned())
}

/// 取出抛出值的消息：`Error` 取 `message`，其它值取字符串形式
pub(crate) fn error_message(err: &JsError, ctx: &mut Context) -> String {
    if let Ok(native) = err.try_native(ctx) {
        return native.message().to_string();
    }
    let value = err.to_opaque(ctx);
    if let Some(object) = value.as_object() {
        if let Ok(message) = object.get(js_string!("message"), ctx) {
            if !message.is_undefined() {
                if let Ok(message) = message.to_string(ctx) {
                    return message.to_std_string_escaped();
                }
            }
        }
    }
    value
        .to_string(ctx)
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|_| err.to_string())
}

/// 链接表项：(导入方, 说明符) → 目标模块或推迟报告的错误
type Link = Result<ModuleId, RenderError>;

/// 单次渲染的状态
pub(crate) struct RenderState {
    resolver: Arc<dyn ViewResolver>,
    cache: Arc<ProgramCache>,
    /// 已在顶层求值的模块包装函数
    wrappers: RefCell<HashMap<ModuleId, JsObject>>,
    /// 加载或求值失败的模块
    broken: RefCell<HashMap<ModuleId, RenderError>>,
    links: RefCell<HashMap<(ModuleId, String), Link>>,
    modules: RefCell<HashMap<ModuleId, JsObject>>,
    depth: Cell<usize>,
    max_depth: usize,
    /// 脚本无法捕获的失败，优先于抛出值本身
    failure: RefCell<Option<RenderError>>,
    logger: Arc<Logger>,
}

impl RenderState {
    /// 登记失败并返回要抛出的脚本错误
    fn fail(&self, error: RenderError) -> JsError {
        let message = error.message.clone();
        self.failure.borrow_mut().get_or_insert(error);
        JsNativeError::error().with_message(message).into()
    }

    /// 把抛出值转为渲染错误
    fn failure(&self, err: JsError, id: &ModuleId, ctx: &mut Context) -> RenderError {
        if let Some(failure) = self.failure.borrow_mut().take() {
            return failure;
        }
        let message = error_message(&err, ctx);
        RenderError::execute(&id.path, message, Some(format!("at {}", id.url())))
    }

    /// 从根模块出发遍历 import 图，求值每个模块的包装函数
    fn link(&self, roots: &[ModuleId], ctx: &mut Context) {
        let mut queue: VecDeque<ModuleId> = roots.iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            if self.wrappers.borrow().contains_key(&id) || self.broken.borrow().contains_key(&id) {
                continue;
            }

            let program = match self.cache.load(&id, self.resolver.as_ref()) {
                Ok(program) => program,
                Err(err) => {
                    self.broken.borrow_mut().insert(id, err.into());
                    continue;
                }
            };

            match evaluate_wrapper(&program.script, ctx) {
                Ok(wrapper) => {
                    self.wrappers.borrow_mut().insert(id.clone(), wrapper);
                }
                Err(err) => {
                    let message = error_message(&err, ctx);
                    let stack = Some(format!("at {}", id.url()));
                    let error = RenderError::execute(&id.path, message, stack);
                    self.broken.borrow_mut().insert(id, error);
                    continue;
                }
            }

            for specifier in &program.imports {
                let link = self
                    .resolver
                    .resolve_module(&id, specifier)
                    .map_err(|err| RenderError::load(&id.path, err.to_string()));
                if let Ok(target) = &link {
                    queue.push_back(target.clone());
                }
                self.links
                    .borrow_mut()
                    .insert((id.clone(), specifier.clone()), link);
            }
        }
        wax_log::debug!(
            self.logger,
            target: "wax::execute",
            "linked {} modules, {} failed",
            self.wrappers.borrow().len(),
            self.broken.borrow().len()
        );
    }

    /// `do_import` 的目标：查链接表，表中没有的说明符当场解析
    fn target(&self, from: &ModuleId, specifier: &str) -> Link {
        let key = (from.clone(), specifier.to_string());
        if let Some(link) = self.links.borrow().get(&key) {
            return link.clone();
        }
        self.resolver
            .resolve_module(from, specifier)
            .map_err(|err| RenderError::load(&from.path, err.to_string()))
    }

    /// 取得模块记录，首次引用时执行模块体
    fn import(self: &Rc<Self>, id: &ModuleId, main: bool, ctx: &mut Context) -> JsResult<JsObject> {
        let existing = self.modules.borrow().get(id).cloned();
        if let Some(module) = existing {
            return Ok(module);
        }

        if self.depth.get() >= self.max_depth {
            return Err(self.fail(RenderError::execute(
                &id.path,
                "import depth limit exceeded",
                Some(format!("at {}", id.url())),
            )));
        }

        let broken = self.broken.borrow().get(id).cloned();
        if let Some(err) = broken {
            return Err(self.fail(err));
        }
        let wrapper = self.wrappers.borrow().get(id).cloned();
        let Some(wrapper) = wrapper else {
            return Err(self.fail(RenderError::load(
                &id.path,
                format!("module '{}' was not linked before execution", id.path),
            )));
        };

        let module = self.create_module(id, main, ctx)?;
        self.modules.borrow_mut().insert(id.clone(), module.clone());

        self.depth.set(self.depth.get() + 1);
        let result = wrapper.call(&JsValue::undefined(), &[module.clone().into()], ctx);
        self.depth.set(self.depth.get() - 1);

        if let Err(err) = result {
            if self.failure.borrow().is_none() {
                let message = error_message(&err, ctx);
                *self.failure.borrow_mut() = Some(RenderError::execute(
                    &id.path,
                    message,
                    Some(format!("at {}", id.url())),
                ));
            }
            return Err(err);
        }

        wax_log::trace!(self.logger, target: "wax::execute", "linked {}", id.url());
        Ok(module)
    }

    /// `{ meta, exports, default, do_import }`
    fn create_module(self: &Rc<Self>, id: &ModuleId, main: bool, ctx: &mut Context) -> JsResult<JsObject> {
        let meta = ObjectInitializer::new(ctx)
            .property(js_string!("dirname"), JsString::from(id.dirname()), Attribute::all())
            .property(js_string!("filename"), JsString::from(id.filename()), Attribute::all())
            .property(js_string!("url"), JsString::from(id.url()), Attribute::all())
            .property(js_string!("main"), main, Attribute::all())
            .build();
        let exports = JsObject::with_object_proto(ctx.intrinsics());

        let do_import = NativeFunction::from_copy_closure_with_captures(
            |_this, args, capture: &ImportCapture, ctx| {
                let specifier = args.get_or_undefined(0).to_string(ctx)?.to_std_string_escaped();
                let id = match capture.state.target(&capture.from, &specifier) {
                    Ok(id) => id,
                    Err(err) => return Err(capture.state.fail(err)),
                };
                capture.state.import(&id, false, ctx).map(JsValue::from)
            },
            ImportCapture {
                state: self.clone(),
                from: id.clone(),
            },
        );
        let do_import = FunctionObjectBuilder::new(ctx.realm(), do_import)
            .name(js_string!("do_import"))
            .length(1)
            .build();

        let module = ObjectInitializer::new(ctx)
            .property(js_string!("meta"), meta, Attribute::all())
            .property(js_string!("exports"), exports, Attribute::all())
            .property(js_string!("default"), JsValue::undefined(), Attribute::all())
            .property(js_string!("do_import"), do_import, Attribute::all())
            .build();
        Ok(module)
    }
}

#[derive(Trace, Finalize)]
struct ImportCapture {
    #[unsafe_ignore_trace]
    state: Rc<RenderState>,
    #[unsafe_ignore_trace]
    from: ModuleId,
}

/// 在顶层求值包装脚本，得到以模块记录为参数的函数
fn evaluate_wrapper(script: &str, ctx: &mut Context) -> JsResult<JsObject> {
    let wrapper = ctx.eval(Source::from_bytes(script))?;
    match wrapper.as_callable() {
        Some(wrapper) => Ok(wrapper.clone()),
        None => Err(JsNativeError::typ()
            .with_message("module wrapper is not callable")
            .into()),
    }
}
