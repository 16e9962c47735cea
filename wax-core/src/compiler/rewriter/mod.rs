//! 具体语法重写器
//!
//! 把一份 JSX/TSX 源码改写成沙箱可以直接执行的脚本：
//!
//! - import / export 改写为对 `module` 记录的读写
//! - 标记（JSX）改写为 writer 调用链
//! - TypeScript 类型语法擦除为等长空白
//!
//! 重写基于游标：`Cursor::last` 之前的源码已经处理完毕，其余部分在下一次
//! `copy_to` 时原样拷贝。未识别的节点不做任何改动，因此没有 import / export /
//! 标记的文件重写后与原文逐字节相同。
//!
//! 生成的替换文本不会比原文少换行，脚本第 N 行就是源码第 N 行。

mod error;
mod jsx;
mod module;
mod node;
mod scope;

pub use error::{RewriteError, RewriteResult};

use std::collections::HashMap;

use node::{is_erased_token, NodeKind};
use tree_sitter::{Node, Parser};

/// 重写结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// 可执行脚本正文
    pub script: String,
    /// 非致命的诊断信息（自闭合 / void 元素一致性等）
    pub warnings: Vec<String>,
    /// 脚本中 `module.do_import` 的全部说明符，去重，按出现顺序
    pub imports: Vec<String>,
}

/// 重写一个源文件
///
/// `file_name` 只用于诊断信息。
pub fn rewrite(file_name: &str, source: &str) -> RewriteResult<Rewritten> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
        .map_err(|e| RewriteError::Grammar(e.to_string()))?;
    let tree = parser.parse(source, None).ok_or(RewriteError::NoTree)?;
    let root = tree.root_node();

    check_syntax(root, source)?;

    let mut rewriter = Rewriter {
        src: source,
        file_name,
        hoisted: String::new(),
        warnings: Vec::new(),
        svg_depth: 0,
        imports: Vec::new(),
        records: HashMap::new(),
        live: HashMap::new(),
    };
    rewriter.bind_imports(root);
    let mut cursor = Cursor::new(source, 0);
    rewriter.visit(root, &mut cursor)?;
    cursor.copy_to(source.len());

    // 提升的导出赋值放在第一行，不新增行
    let mut script = rewriter.hoisted;
    script.push_str(&cursor.out);

    Ok(Rewritten {
        script,
        warnings: rewriter.warnings,
        imports: rewriter.imports,
    })
}

/// 扫描语法树中的错误节点
///
/// 字符串里以 `&` 开头的 ERROR 是语法歧义，予以放行。
fn check_syntax(root: Node, src: &str) -> RewriteResult<()> {
    if !root.has_error() {
        return Ok(());
    }
    if root.is_error() {
        return Err(RewriteError::UnexpectedEnd);
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let tolerated = node.is_error()
                && node.parent().is_some_and(|p| p.kind() == "string")
                && src[node.start_byte()..node.end_byte()].starts_with('&');
            if tolerated {
                continue;
            }
            let whole = node.start_byte() == 0 && node.end_byte() == src.len();
            if node.parent().is_none() || whole {
                return Err(RewriteError::UnexpectedEnd);
            }
            return Err(RewriteError::Syntax {
                start: node.start_position().row + 1,
                end: node.end_position().row + 1,
            });
        }
        if node.has_error() {
            // 逆序压栈，先报告靠前的错误
            let mut walker = node.walk();
            let children: Vec<Node> = node.children(&mut walker).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    Ok(())
}

/// 重写游标
///
/// `out` 是已生成的文本，`last` 是已处理到的源码偏移，单调不减。
pub(crate) struct Cursor<'s> {
    src: &'s str,
    out: String,
    last: usize,
}

impl<'s> Cursor<'s> {
    pub(crate) fn new(src: &'s str, start: usize) -> Self {
        Self {
            src,
            out: String::new(),
            last: start,
        }
    }

    /// 原样拷贝到 `pos`
    pub(crate) fn copy_to(&mut self, pos: usize) {
        if pos > self.last {
            self.out.push_str(&self.src[self.last..pos]);
            self.last = pos;
        }
    }

    /// 跳过到 `pos`，不输出
    pub(crate) fn skip_to(&mut self, pos: usize) {
        if pos > self.last {
            self.last = pos;
        }
    }

    /// 用等长空白替换 `[start, end)`，保留换行
    pub(crate) fn blank(&mut self, start: usize, end: usize) {
        self.copy_to(start);
        let from = self.last.max(start);
        if end <= from {
            return;
        }
        for c in self.src[from..end].chars() {
            match c {
                '\n' | '\r' => self.out.push(c),
                other => {
                    for _ in 0..other.len_utf8() {
                        self.out.push(' ');
                    }
                }
            }
        }
        self.last = end;
    }

    /// 用 `text` 替换 `[start, end)`，并补足原文中的换行
    pub(crate) fn replace(&mut self, start: usize, end: usize, text: &str) {
        self.copy_to(start);
        self.out.push_str(text);
        let lost = count_newlines(&self.src[start..end]).saturating_sub(count_newlines(text));
        for _ in 0..lost {
            self.out.push('\n');
        }
        self.skip_to(end);
    }

    /// 直接输出文本，不移动游标
    pub(crate) fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn into_output(self) -> String {
        self.out
    }
}

pub(crate) fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// 转义后放入模板字符串
pub(crate) fn template_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

/// JSON 字符串字面量，同时也是合法的脚本字符串
pub(crate) fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// `obj.name`，名字不是标识符时用 `obj["name"]`
pub(crate) fn member(object: &str, name: &str) -> String {
    let mut chars = name.chars();
    let is_ident = chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric());
    if is_ident {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, js_string(name))
    }
}

/// 重写器状态，跨越一次 `rewrite` 调用
pub(crate) struct Rewriter<'s> {
    pub(crate) src: &'s str,
    pub(crate) file_name: &'s str,
    /// 放到脚本最前面的导出赋值（函数声明会被提升）
    pub(crate) hoisted: String,
    pub(crate) warnings: Vec<String>,
    /// 当前所在 svg 子树的层数
    pub(crate) svg_depth: usize,
    pub(crate) imports: Vec<String>,
    /// import 语句起始偏移 => 保存模块记录的变量名
    pub(crate) records: HashMap<usize, String>,
    /// 具名导入的本地名 => 实时读取表达式
    pub(crate) live: HashMap<String, String>,
}

impl<'s> Rewriter<'s> {
    pub(crate) fn text(&self, node: Node) -> &'s str {
        &self.src[node.start_byte()..node.end_byte()]
    }

    pub(crate) fn line(node: Node) -> usize {
        node.start_position().row + 1
    }

    pub(crate) fn warn(&mut self, node: Node, message: impl AsRef<str>) {
        self.warnings.push(format!(
            "{}:{}: {}",
            self.file_name,
            Self::line(node),
            message.as_ref()
        ));
    }

    /// 访问一个节点，把改写结果写入游标
    pub(crate) fn visit(&mut self, node: Node, cur: &mut Cursor) -> RewriteResult<()> {
        match NodeKind::of(node.kind()) {
            NodeKind::Import => self.rewrite_import(node, cur),
            NodeKind::Export => self.rewrite_export(node, cur),
            NodeKind::MetaProperty => {
                if self.text(node).replace(char::is_whitespace, "") == "import.meta" {
                    cur.replace(node.start_byte(), node.end_byte(), "module.meta");
                }
                Ok(())
            }
            NodeKind::JsxElement | NodeKind::JsxSelfClosingElement => {
                let expr = self.jsx_expression(node)?;
                cur.replace(node.start_byte(), node.end_byte(), &expr);
                Ok(())
            }
            NodeKind::TypeOnly => {
                cur.blank(node.start_byte(), node.end_byte());
                Ok(())
            }
            NodeKind::Cast => {
                if let Some(expr) = node.named_child(0) {
                    self.visit(expr, cur)?;
                    cur.blank(expr.end_byte(), node.end_byte());
                }
                Ok(())
            }
            NodeKind::NonNull => {
                if let Some(expr) = node.named_child(0) {
                    self.visit(expr, cur)?;
                    cur.blank(expr.end_byte(), node.end_byte());
                }
                Ok(())
            }
            NodeKind::Identifier => {
                if let Some(live) = self.live_binding(node, self.text(node)) {
                    cur.replace(node.start_byte(), node.end_byte(), &live);
                }
                Ok(())
            }
            NodeKind::ShorthandProperty => {
                let name = self.text(node);
                if let Some(live) = self.live_binding(node, name) {
                    cur.replace(node.start_byte(), node.end_byte(), &format!("{}: {}", name, live));
                }
                Ok(())
            }
            NodeKind::Unsupported => Err(RewriteError::Unsupported(node.kind().to_string())),
            NodeKind::Passthrough => self.visit_children(node, cur),
        }
    }

    pub(crate) fn visit_children(&mut self, node: Node, cur: &mut Cursor) -> RewriteResult<()> {
        let parent = node.kind();
        let mut walker = node.walk();
        let children: Vec<Node> = node.children(&mut walker).collect();
        for child in children {
            if !child.is_named() && is_erased_token(parent, child.kind()) {
                cur.blank(child.start_byte(), child.end_byte());
            } else if child.child_count() > 0 || child.is_named() {
                self.visit(child, cur)?;
            }
        }
        Ok(())
    }

    /// 单独改写一个子表达式，返回其文本
    pub(crate) fn expr_text(&mut self, node: Node) -> RewriteResult<String> {
        self.range_text(node.start_byte(), node.end_byte(), &[node])
    }

    /// 改写 `[start, end)` 区间，区间内只有 `nodes` 需要访问
    pub(crate) fn range_text(
        &mut self,
        start: usize,
        end: usize,
        nodes: &[Node],
    ) -> RewriteResult<String> {
        let mut sub = Cursor::new(self.src, start);
        for node in nodes {
            self.visit(*node, &mut sub)?;
        }
        sub.copy_to(end);
        Ok(sub.into_output())
    }
}
