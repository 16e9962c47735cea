//! 沙箱桥接
//!
//! 把 [`HtmlWriter`] 暴露给脚本：写入器对象带有 `WriteHTML`、`WriteValue`、
//! `WriteAttribute`、`WriteAttributes` 四个可链式调用的方法，
//! 另外安装全局的 `wax` 辅助对象（`Sub`、`Raw`、`Now`）。

use std::cell::RefCell;
use std::rc::Rc;

use boa_engine::object::builtins::{JsArray, JsDate};
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsData, JsError, JsNativeError, JsObject, JsResult, JsValue,
    NativeFunction,
};
use boa_gc::{Finalize, Trace};
use chrono::{DateTime, Utc};

use super::value::object_keys;
use super::writer::{Host, HtmlWriter, ValueKind};

/// 安全 HTML 标记，由 `wax.Raw` 与 `wax.Now` 产生
#[derive(Debug, Trace, Finalize, JsData)]
pub struct SafeHtml {
    #[unsafe_ignore_trace]
    pub html: String,
}

/// 写入器对象的内部数据：共享的输出缓冲
#[derive(Trace, Finalize, JsData)]
struct WriterData {
    #[unsafe_ignore_trace]
    sink: Rc<RefCell<String>>,
}

pub(crate) fn safe_html(html: String, ctx: &mut Context) -> JsObject {
    let proto = ctx.intrinsics().constructors().object().prototype();
    JsObject::from_proto_and_data(Some(proto), SafeHtml { html })
}

/// 以脚本值为宿主的写入器
pub struct BoaHost<'c> {
    ctx: &'c mut Context,
    writer: JsObject,
    sink: Rc<RefCell<String>>,
}

impl<'c> BoaHost<'c> {
    pub fn new(ctx: &'c mut Context, writer: JsObject, sink: Rc<RefCell<String>>) -> Self {
        Self { ctx, writer, sink }
    }
}

impl Host for BoaHost<'_> {
    type Value = JsValue;
    type Error = JsError;

    fn classify(&mut self, value: &JsValue) -> JsResult<ValueKind> {
        Ok(match value {
            JsValue::Undefined | JsValue::Null => ValueKind::Absent,
            JsValue::Boolean(b) => ValueKind::Bool(*b),
            JsValue::String(s) => ValueKind::Str(s.to_std_string_escaped()),
            JsValue::Integer(n) => ValueKind::Int(i64::from(*n)),
            JsValue::Rational(f) => ValueKind::Float(*f),
            JsValue::BigInt(b) => ValueKind::BigInt(b.to_string()),
            JsValue::Symbol(s) => ValueKind::Other(s.descriptive_string().to_std_string_escaped()),
            JsValue::Object(object) => {
                if let Some(safe) = object.downcast_ref::<SafeHtml>() {
                    ValueKind::Safe(safe.html.clone())
                } else if object.is_callable() {
                    ValueKind::Callable
                } else if object.is_array() {
                    ValueKind::List
                } else if let Ok(date) = JsDate::from_object(object.clone()) {
                    let time = date.get_time(self.ctx)?.to_number(self.ctx)?;
                    match DateTime::<Utc>::from_timestamp_millis(time as i64) {
                        Some(date) if time.is_finite() => ValueKind::Date(date),
                        _ => ValueKind::Other("Invalid Date".to_string()),
                    }
                } else {
                    ValueKind::Map
                }
            }
        })
    }

    fn items(&mut self, value: &JsValue) -> JsResult<Vec<JsValue>> {
        let Some(object) = value.as_object() else {
            return Ok(Vec::new());
        };
        let array = JsArray::from_object(object.clone())?;
        let len = array.length(self.ctx)?;
        let mut items = Vec::with_capacity(len as usize);
        for i in 0..len {
            items.push(array.get(i as u32, self.ctx)?);
        }
        Ok(items)
    }

    fn entries(&mut self, value: &JsValue) -> JsResult<Vec<(String, JsValue)>> {
        let Some(object) = value.as_object() else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        for key in object_keys(object, self.ctx)? {
            let item = object.get(js_string_of(&key), self.ctx)?;
            entries.push((key, item));
        }
        Ok(entries)
    }

    fn invoke(&mut self, callable: &JsValue) -> JsResult<()> {
        if let Some(function) = callable.as_callable() {
            let writer = JsValue::from(self.writer.clone());
            function.call(&JsValue::undefined(), &[writer], self.ctx)?;
        }
        Ok(())
    }

    fn raw(&mut self, text: &str) {
        self.sink.borrow_mut().push_str(text);
    }

    fn error(&mut self, message: &str) -> JsError {
        JsNativeError::typ().with_message(message.to_string()).into()
    }
}

fn js_string_of(text: &str) -> boa_engine::JsString {
    boa_engine::JsString::from(text)
}

/// 写入器方法所在的原型，每个渲染上下文一个
#[derive(Clone, Trace, Finalize)]
pub struct WriterProto {
    proto: JsObject,
}

impl WriterProto {
    pub fn new(ctx: &mut Context) -> Self {
        let proto = ObjectInitializer::new(ctx)
            .function(NativeFunction::from_fn_ptr(write_html), js_string!("WriteHTML"), 1)
            .function(NativeFunction::from_fn_ptr(write_value), js_string!("WriteValue"), 1)
            .function(
                NativeFunction::from_fn_ptr(write_attribute),
                js_string!("WriteAttribute"),
                2,
            )
            .function(
                NativeFunction::from_fn_ptr(write_attributes),
                js_string!("WriteAttributes"),
                1,
            )
            .build();
        Self { proto }
    }

    /// 创建写入 `sink` 的写入器对象
    pub fn writer(&self, sink: Rc<RefCell<String>>) -> JsObject {
        JsObject::from_proto_and_data(Some(self.proto.clone()), WriterData { sink })
    }

    /// 把一个值完整写入新的缓冲并返回结果
    pub fn drain(&self, value: &JsValue, ctx: &mut Context) -> JsResult<String> {
        let sink = Rc::new(RefCell::new(String::new()));
        let writer = self.writer(sink.clone());
        HtmlWriter::new(BoaHost::new(ctx, writer, sink.clone())).write_value(value)?;
        let out = sink.borrow().clone();
        Ok(out)
    }
}

fn this_writer(this: &JsValue) -> JsResult<(JsObject, Rc<RefCell<String>>)> {
    let object = this
        .as_object()
        .ok_or_else(|| JsNativeError::typ().with_message("not a writer"))?;
    let sink = object
        .downcast_ref::<WriterData>()
        .map(|data| data.sink.clone())
        .ok_or_else(|| JsNativeError::typ().with_message("not a writer"))?;
    Ok((object.clone(), sink))
}

fn write_html(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let (writer, sink) = this_writer(this)?;
    let JsValue::String(html) = args.get_or_undefined(0) else {
        return Err(JsNativeError::typ()
            .with_message("WriteHTML expects a string")
            .into());
    };
    HtmlWriter::new(BoaHost::new(ctx, writer, sink)).write_html(&html.to_std_string_escaped());
    Ok(this.clone())
}

fn write_value(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let (writer, sink) = this_writer(this)?;
    if let Some(value) = args.first() {
        HtmlWriter::new(BoaHost::new(ctx, writer, sink)).write_value(value)?;
    }
    Ok(this.clone())
}

fn write_attribute(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let (writer, sink) = this_writer(this)?;
    let name = args.get_or_undefined(0).to_string(ctx)?.to_std_string_escaped();
    HtmlWriter::new(BoaHost::new(ctx, writer, sink)).write_attribute(&name, args.get_or_undefined(1))?;
    Ok(this.clone())
}

fn write_attributes(this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let (writer, sink) = this_writer(this)?;
    HtmlWriter::new(BoaHost::new(ctx, writer, sink)).write_attributes(args.get_or_undefined(0))?;
    Ok(this.clone())
}

/// 安装全局 `wax` 对象
pub fn install_wax(proto: &WriterProto, ctx: &mut Context) -> JsResult<()> {
    let now = NativeFunction::from_copy_closure_with_captures(
        |_this, args, proto: &WriterProto, ctx| {
            let html = proto.drain(args.get_or_undefined(0), ctx)?;
            Ok(safe_html(html, ctx).into())
        },
        proto.clone(),
    );
    let wax = ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(sub), js_string!("Sub"), 1)
        .function(NativeFunction::from_fn_ptr(raw), js_string!("Raw"), 1)
        .function(now, js_string!("Now"), 1)
        .build();
    ctx.register_global_property(js_string!("wax"), wax, Attribute::all())
}

fn sub(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(args.get_or_undefined(0).clone())
}

fn raw(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let html = match args.get_or_undefined(0) {
        JsValue::Undefined | JsValue::Null => String::new(),
        value => value.to_string(ctx)?.to_std_string_escaped(),
    };
    Ok(safe_html(html, ctx).into())
}
