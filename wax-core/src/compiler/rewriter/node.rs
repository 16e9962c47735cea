//! 语法节点分类
//!
//! tree-sitter 只给出字符串形式的节点类型，这里把重写器关心的类型收拢成封闭枚举，
//! 其余一律 `Passthrough`，原样拷贝。

/// 重写器关心的节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// `import ... from "m"`
    Import,
    /// 各种 export 语句
    Export,
    /// `import.meta`（`new.target` 也是这个类型）
    MetaProperty,
    /// `<a>...</a>`，也包括片段 `<>...</>`
    JsxElement,
    /// `<a />`
    JsxSelfClosingElement,
    /// 整个节点只有类型含义，擦除为空白
    TypeOnly,
    /// `x as T` / `x satisfies T`，保留表达式，擦除尾部
    Cast,
    /// `x!`
    NonNull,
    /// 标识符引用，可能指向具名导入
    Identifier,
    /// 对象字面量里的 `{ a }`
    ShorthandProperty,
    /// 不支持的语法
    Unsupported,
    /// 原样拷贝，继续访问子节点
    Passthrough,
}

impl NodeKind {
    pub(crate) fn of(kind: &str) -> Self {
        match kind {
            "import_statement" => NodeKind::Import,
            "export_statement" => NodeKind::Export,
            "meta_property" => NodeKind::MetaProperty,
            "jsx_element" => NodeKind::JsxElement,
            "jsx_self_closing_element" => NodeKind::JsxSelfClosingElement,
            "type_alias_declaration"
            | "interface_declaration"
            | "type_annotation"
            | "opting_type_annotation"
            | "omitting_type_annotation"
            | "adding_type_annotation"
            | "asserts_annotation"
            | "type_predicate_annotation"
            | "type_arguments"
            | "type_parameters"
            | "ambient_declaration"
            | "accessibility_modifier"
            | "override_modifier"
            | "implements_clause"
            | "function_signature"
            | "method_signature"
            | "abstract_method_signature"
            | "index_signature" => NodeKind::TypeOnly,
            "as_expression" | "satisfies_expression" => NodeKind::Cast,
            "non_null_expression" => NodeKind::NonNull,
            "identifier" => NodeKind::Identifier,
            "shorthand_property_identifier" => NodeKind::ShorthandProperty,
            "enum_declaration" | "import_alias" | "module" | "internal_module" => {
                NodeKind::Unsupported
            }
            _ => NodeKind::Passthrough,
        }
    }
}

/// 在给定父节点下需要擦除的匿名 token
///
/// 可选参数的 `?`、确定赋值的 `!`，以及类成员上的修饰关键字。
pub(crate) fn is_erased_token(parent: &str, token: &str) -> bool {
    match token {
        "?" => matches!(
            parent,
            "optional_parameter" | "public_field_definition" | "method_definition"
        ),
        "!" => matches!(parent, "public_field_definition" | "variable_declarator"),
        "abstract" => matches!(
            parent,
            "abstract_class_declaration" | "abstract_class" | "public_field_definition"
        ),
        "readonly" | "declare" => matches!(
            parent,
            "public_field_definition" | "required_parameter" | "optional_parameter"
        ),
        _ => false,
    }
}

/// HTML void 元素，不能有闭合标签和子节点
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// 含连字符的小写标签视为自定义元素
pub(crate) fn is_custom_tag(tag: &str) -> bool {
    tag.contains('-')
}
