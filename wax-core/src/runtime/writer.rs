//! HTML 安全写入器
//!
//! [`HtmlWriter`] 只负责序列化与转义规则，值的分类、调用和输出缓冲
//! 都交给 [`Host`]。沙箱桥接层为脚本值实现 `Host`。

use chrono::{DateTime, Utc};

/// 属性包标记：以该名字写入的映射逐项展开为属性
pub const ATTRIBUTE_BAG: &str = "wax-attrs";

/// 值的种类
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// null / undefined
    Absent,
    Bool(bool),
    /// 已标记为安全的 HTML
    Safe(String),
    Str(String),
    Int(i64),
    Float(f64),
    /// 大整数的十进制文本
    BigInt(String),
    Date(DateTime<Utc>),
    /// 有序序列，元素通过 [`Host::items`] 取得
    List,
    /// 键值映射，条目通过 [`Host::entries`] 取得
    Map,
    /// 可调用值
    Callable,
    /// 其它值的默认文本形式
    Other(String),
}

/// 写入器的宿主
pub trait Host {
    type Value: Clone;
    type Error;

    fn classify(&mut self, value: &Self::Value) -> Result<ValueKind, Self::Error>;

    fn items(&mut self, value: &Self::Value) -> Result<Vec<Self::Value>, Self::Error>;

    fn entries(&mut self, value: &Self::Value) -> Result<Vec<(String, Self::Value)>, Self::Error>;

    /// 以写入器本身为参数调用子渲染
    fn invoke(&mut self, callable: &Self::Value) -> Result<(), Self::Error>;

    /// 原样追加输出
    fn raw(&mut self, text: &str);

    fn error(&mut self, message: &str) -> Self::Error;
}

/// HTML 转义，并把空格替换为 `&nbsp;`
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            ' ' => out.push_str("&nbsp;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// 数字的最短十进制形式
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{}", value)
    }
}

/// UTC，毫秒精度，`Z` 结尾
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// `backgroundColor` → `background-color`
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// 取值为 `"true"` / `"false"` 的布尔属性
pub fn is_enumerated_boolean(name: &str) -> bool {
    name == "draggable" || name == "spellcheck" || name.starts_with("aria-")
}

fn is_falsy(kind: &ValueKind) -> bool {
    match kind {
        ValueKind::Absent | ValueKind::Bool(false) => true,
        ValueKind::Int(0) => true,
        ValueKind::Float(f) => *f == 0.0,
        _ => false,
    }
}

pub struct HtmlWriter<H: Host> {
    host: H,
}

impl<H: Host> HtmlWriter<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// 原样写入
    pub fn write_html(&mut self, html: &str) {
        self.host.raw(html);
    }

    /// 按值的种类写入，默认转义
    pub fn write_value(&mut self, value: &H::Value) -> Result<(), H::Error> {
        let kind = self.host.classify(value)?;
        match kind {
            ValueKind::Absent | ValueKind::Bool(_) => Ok(()),
            ValueKind::Safe(html) => {
                self.host.raw(&html);
                Ok(())
            }
            ValueKind::List => {
                for item in self.host.items(value)? {
                    self.write_value(&item)?;
                }
                Ok(())
            }
            ValueKind::Callable => self.host.invoke(value),
            other => {
                let text = self.text(other, value)?;
                self.host.raw(&text);
                Ok(())
            }
        }
    }

    /// 写入单个属性
    pub fn write_attribute(&mut self, name: &str, value: &H::Value) -> Result<(), H::Error> {
        let text = self.attribute_text(name, value)?;
        self.host.raw(&text);
        Ok(())
    }

    /// 展开映射为属性，键按字典序，跳过 `children`
    pub fn write_attributes(&mut self, value: &H::Value) -> Result<(), H::Error> {
        match self.host.classify(value)? {
            ValueKind::Absent => Ok(()),
            ValueKind::Map => {
                let text = self.entries_text(value)?;
                self.host.raw(&text);
                Ok(())
            }
            _ => Err(self.host.error("WriteAttributes expects an object")),
        }
    }

    /// 单个属性的输出；不输出时为空串
    fn attribute_text(&mut self, name: &str, value: &H::Value) -> Result<String, H::Error> {
        let kind = self.host.classify(value)?;
        Ok(match kind {
            ValueKind::Absent => String::new(),
            ValueKind::Bool(flag) => {
                if is_enumerated_boolean(name) {
                    format!("{}=\"{}\"", name, flag)
                } else if flag {
                    name.to_string()
                } else {
                    String::new()
                }
            }
            ValueKind::Map if name == ATTRIBUTE_BAG => self.entries_text(value)?,
            ValueKind::Map if name == "style" => self.style_text(value)?,
            ValueKind::Map => format!("{}=\"[object Object]\"", name),
            ValueKind::List => {
                let separator = if name == "class" { " " } else { "," };
                let mut parts = Vec::new();
                for item in self.host.items(value)? {
                    let kind = self.host.classify(&item)?;
                    if !is_falsy(&kind) {
                        parts.push(self.text(kind, &item)?);
                    }
                }
                format!("{}=\"{}\"", name, parts.join(separator))
            }
            other => {
                let text = self.text(other, value)?;
                format!("{}=\"{}\"", name, text)
            }
        })
    }

    /// 非空的属性之间以单个空格分隔
    fn entries_text(&mut self, value: &H::Value) -> Result<String, H::Error> {
        let mut entries = self.host.entries(value)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut parts = Vec::new();
        for (key, item) in entries {
            if key == "children" {
                continue;
            }
            let text = self.attribute_text(&key, &item)?;
            if !text.is_empty() {
                parts.push(text);
            }
        }
        Ok(parts.join(" "))
    }

    fn style_text(&mut self, value: &H::Value) -> Result<String, H::Error> {
        let mut entries = self.host.entries(value)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut rules = Vec::new();
        for (key, item) in entries {
            if let ValueKind::Str(text) = self.host.classify(&item)? {
                if text.is_empty() {
                    continue;
                }
                let text = text.replace('"', "\\22").replace(';', "\\3B");
                rules.push(format!("{}: {}", kebab_case(&key), text));
            }
        }
        if rules.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("style=\"{}\"", rules.join(";")))
    }

    /// 转义后的文本形式
    fn text(&mut self, kind: ValueKind, value: &H::Value) -> Result<String, H::Error> {
        Ok(match kind {
            ValueKind::Absent => String::new(),
            ValueKind::Bool(flag) => flag.to_string(),
            ValueKind::Safe(text) | ValueKind::Str(text) | ValueKind::Other(text) => {
                escape_html(&text)
            }
            ValueKind::Int(n) => n.to_string(),
            ValueKind::Float(f) => format_float(f),
            ValueKind::BigInt(digits) => digits,
            ValueKind::Date(date) => format_date(&date),
            ValueKind::Map => escape_html("[object Object]"),
            ValueKind::List => {
                let mut parts = Vec::new();
                for item in self.host.items(value)? {
                    let kind = self.host.classify(&item)?;
                    parts.push(self.text(kind, &item)?);
                }
                parts.join(",")
            }
            ValueKind::Callable => return Err(self.host.error("function is not allowed here")),
        })
    }
}
