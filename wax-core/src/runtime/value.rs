//! 宿主值
//!
//! 调用方传入的模型和全局对象。JSON 数据直接转换为脚本值，
//! 宿主函数包装为可从脚本调用的原生函数。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use boa_engine::object::builtins::JsArray;
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::{js_string, Context, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{Finalize, Trace};
use serde_json::{Map, Number, Value as Json};

use super::bridge::safe_html;

type HostFn = dyn Fn(&[Json]) -> Result<HostValue, String> + Send + Sync;

/// 可从脚本调用的宿主函数
///
/// 参数以 JSON 形式传入；返回 `Err` 时脚本侧抛出 `Error`。
#[derive(Clone)]
pub struct HostFunction(Arc<HostFn>);

impl HostFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Json]) -> Result<HostValue, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Json]) -> Result<HostValue, String> {
        (self.0)(args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostFunction")
    }
}

/// 宿主值
#[derive(Debug, Clone)]
pub enum HostValue {
    Json(Json),
    Function(HostFunction),
    Object(BTreeMap<String, HostValue>),
    List(Vec<HostValue>),
    /// 已是安全 HTML 的文本
    Html(String),
}

impl HostValue {
    pub fn null() -> Self {
        HostValue::Json(Json::Null)
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Json]) -> Result<HostValue, String> + Send + Sync + 'static,
    {
        HostValue::Function(HostFunction::new(f))
    }

    /// 转换为脚本值
    pub fn to_js(&self, ctx: &mut Context) -> JsResult<JsValue> {
        match self {
            HostValue::Json(json) => JsValue::from_json(json, ctx),
            HostValue::Function(f) => Ok(host_function(f.clone(), ctx).into()),
            HostValue::Object(fields) => {
                let object = JsObject::with_object_proto(ctx.intrinsics());
                for (key, value) in fields {
                    let value = value.to_js(ctx)?;
                    object.create_data_property_or_throw(JsString::from(key.as_str()), value, ctx)?;
                }
                Ok(object.into())
            }
            HostValue::List(items) => {
                let values = items
                    .iter()
                    .map(|item| item.to_js(ctx))
                    .collect::<JsResult<Vec<_>>>()?;
                Ok(JsArray::from_iter(values, ctx).into())
            }
            HostValue::Html(html) => Ok(safe_html(html.clone(), ctx).into()),
        }
    }
}

impl Default for HostValue {
    fn default() -> Self {
        HostValue::null()
    }
}

impl From<Json> for HostValue {
    fn from(value: Json) -> Self {
        HostValue::Json(value)
    }
}

impl From<HostFunction> for HostValue {
    fn from(value: HostFunction) -> Self {
        HostValue::Function(value)
    }
}

#[derive(Trace, Finalize)]
struct HostFnCapture {
    #[unsafe_ignore_trace]
    function: HostFunction,
}

fn host_function(function: HostFunction, ctx: &mut Context) -> JsObject {
    let native = NativeFunction::from_copy_closure_with_captures(
        |_this, args, capture: &HostFnCapture, ctx| {
            let args = args
                .iter()
                .map(|arg| to_json(arg, ctx))
                .collect::<JsResult<Vec<_>>>()?;
            match capture.function.call(&args) {
                Ok(value) => value.to_js(ctx),
                Err(message) => Err(JsNativeError::error().with_message(message).into()),
            }
        },
        HostFnCapture { function },
    );
    FunctionObjectBuilder::new(ctx.realm(), native)
        .name(js_string!("host"))
        .build()
        .into()
}

/// 脚本值转 JSON；undefined 与函数转为 null
pub fn to_json(value: &JsValue, ctx: &mut Context) -> JsResult<Json> {
    Ok(match value {
        JsValue::Undefined | JsValue::Null => Json::Null,
        JsValue::Boolean(b) => Json::Bool(*b),
        JsValue::String(s) => Json::String(s.to_std_string_escaped()),
        JsValue::Integer(n) => Json::from(*n),
        JsValue::Rational(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        JsValue::BigInt(b) => Json::String(b.to_string()),
        JsValue::Symbol(_) => Json::Null,
        JsValue::Object(object) => {
            if object.is_callable() {
                Json::Null
            } else if object.is_array() {
                let array = JsArray::from_object(object.clone())?;
                let len = array.length(ctx)?;
                let mut items = Vec::with_capacity(len as usize);
                for i in 0..len {
                    let item = array.get(i as u32, ctx)?;
                    items.push(to_json(&item, ctx)?);
                }
                Json::Array(items)
            } else {
                let mut map = Map::new();
                for key in object_keys(object, ctx)? {
                    let item = object.get(JsString::from(key.as_str()), ctx)?;
                    map.insert(key, to_json(&item, ctx)?);
                }
                Json::Object(map)
            }
        }
    })
}

/// 自有可枚举字符串键，顺序同 `Object.keys`
pub fn object_keys(object: &JsObject, ctx: &mut Context) -> JsResult<Vec<String>> {
    let constructor = ctx.intrinsics().constructors().object().constructor();
    let keys_fn = constructor.get(js_string!("keys"), ctx)?;
    let Some(keys_fn) = keys_fn.as_callable() else {
        return Err(JsNativeError::typ().with_message("Object.keys is not callable").into());
    };
    let keys = keys_fn.call(&constructor.into(), &[object.clone().into()], ctx)?;
    let Some(keys) = keys.as_object() else {
        return Ok(Vec::new());
    };
    let keys = JsArray::from_object(keys.clone())?;
    let len = keys.length(ctx)?;
    let mut out = Vec::with_capacity(len as usize);
    for i in 0..len {
        let key = keys.get(i as u32, ctx)?;
        out.push(key.to_string(ctx)?.to_std_string_escaped());
    }
    Ok(out)
}
