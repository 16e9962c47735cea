//! 标记改写
//!
//! 元素变成 writer 调用链，组件变成函数调用：
//!
//! ```text
//! <p class="x">Hi {name}</p>   =>  wax.Sub(w => w.WriteHTML(`<p class="x">Hi `).WriteValue(name).WriteHTML(`</p>`))
//! <Card title="t">body</Card>  =>  wax.Sub(w => w.WriteValue(Card({"title": "t", "children": wax.Sub(w => w.WriteHTML(`body`))})))
//! ```

use super::node::{is_custom_tag, is_void_element};
use super::{count_newlines, js_string, template_escape, RewriteError, RewriteResult, Rewriter};
use tree_sitter::Node;

/// writer 调用链构造器
///
/// 静态 HTML 先缓存在 `html` 中，遇到动态调用时才作为一次 `WriteHTML` 输出。
/// 源码中的换行记在 `breaks`，放在两次调用之间，不进入 HTML。
struct Chain {
    out: String,
    html: String,
    breaks: usize,
}

impl Chain {
    fn new() -> Self {
        Self {
            out: String::new(),
            html: String::new(),
            breaks: 0,
        }
    }

    /// 追加已经过模板转义的静态 HTML
    fn html(&mut self, text: &str) {
        self.html.push_str(text);
    }

    fn lines(&mut self, count: usize) {
        self.breaks += count;
    }

    fn flush(&mut self) {
        if !self.html.is_empty() {
            self.out.push_str(".WriteHTML(`");
            self.out.push_str(&self.html);
            self.out.push_str("`)");
            self.html.clear();
        }
    }

    fn emit_breaks(&mut self) {
        for _ in 0..self.breaks {
            self.out.push('\n');
        }
        self.breaks = 0;
    }

    fn call(&mut self, method: &str, args: &str) {
        self.flush();
        self.emit_breaks();
        self.out.push('.');
        self.out.push_str(method);
        self.out.push('(');
        self.out.push_str(args);
        self.out.push(')');
    }

    fn finish(mut self) -> String {
        self.flush();
        self.emit_breaks();
        self.out
    }
}

enum Tag<'s> {
    Fragment,
    Element(&'s str),
    Component(&'s str),
}

/// 子节点分段：连续文本合为一段，其余每个节点一段
enum Segment<'t> {
    Text { text: String, newlines: usize },
    Node(Node<'t>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ChildPolicy {
    Normal,
    Void,
    Textarea,
}

/// 按 JSX 规则整理文本：去掉含换行的空白，行与行之间以单个空格相连
pub(crate) fn clean_jsx_text(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let last_non_empty = lines
        .iter()
        .rposition(|line| line.chars().any(|c| c != ' ' && c != '\t'))
        .unwrap_or(0);

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut trimmed = line.replace('\t', " ");
        if i != 0 {
            trimmed = trimmed.trim_start_matches(' ').to_string();
        }
        if i != lines.len() - 1 {
            trimmed = trimmed.trim_end_matches(' ').to_string();
        }
        if !trimmed.is_empty() {
            if i != last_non_empty {
                trimmed.push(' ');
            }
            out.push_str(&trimmed);
        }
    }
    out
}

fn opening(node: Node) -> Node {
    if node.kind() == "jsx_element" {
        node.child_by_field_name("open_tag").unwrap_or(node)
    } else {
        node
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

impl<'s> Rewriter<'s> {
    fn classify_tag(&self, open: Node) -> RewriteResult<Tag<'s>> {
        let Some(name) = open.child_by_field_name("name") else {
            return Ok(Tag::Fragment);
        };
        let text = self.text(name);
        match name.kind() {
            "jsx_namespace_name" => Err(RewriteError::Unsupported("jsx_namespace_name".to_string())),
            "member_expression" | "nested_identifier" => {
                if starts_uppercase(text) {
                    Ok(Tag::Component(text))
                } else {
                    Err(RewriteError::Unsupported("member_expression".to_string()))
                }
            }
            _ if starts_uppercase(text) => Ok(Tag::Component(text)),
            _ => Ok(Tag::Element(text)),
        }
    }

    /// 一个位于普通表达式位置的 JSX 节点，改写为一个值
    pub(crate) fn jsx_expression(&mut self, node: Node) -> RewriteResult<String> {
        match self.classify_tag(opening(node))? {
            Tag::Component(name) => {
                let call = self.component_call(node, name)?;
                Ok(format!("wax.Sub(w => w.WriteValue({}))", call))
            }
            _ => {
                let mut chain = Chain::new();
                self.element_into(node, &mut chain)?;
                Ok(format!("wax.Sub(w => w{})", chain.finish()))
            }
        }
    }

    fn element_into(&mut self, node: Node, chain: &mut Chain) -> RewriteResult<()> {
        match self.classify_tag(opening(node))? {
            Tag::Fragment => self.children_into(node, chain, ChildPolicy::Normal),
            Tag::Component(name) => {
                let call = self.component_call(node, name)?;
                chain.call("WriteValue", &call);
                Ok(())
            }
            Tag::Element(tag) => self.html_element(node, tag, chain),
        }
    }

    fn html_element(&mut self, node: Node, tag: &str, chain: &mut Chain) -> RewriteResult<()> {
        let open = opening(node);
        let self_closing = node.kind() == "jsx_self_closing_element";
        let void = is_void_element(tag);

        let is_svg = tag == "svg";
        if is_svg {
            self.svg_depth += 1;
        }

        if self.svg_depth == 0 && !is_custom_tag(tag) && tag != "script" {
            if self_closing && !void {
                self.warn(
                    node,
                    format!("<{tag} /> is not a void element, rendered as <{tag}></{tag}>"),
                );
            } else if !self_closing && void {
                self.warn(node, format!("void element <{tag}> should be self-closing"));
            }
        }

        chain.html("<");
        chain.html(tag);
        let textarea_value = self.attributes_into(open, tag, chain)?;
        chain.html(">");

        if void {
            if !self_closing {
                self.children_into(node, chain, ChildPolicy::Void)?;
            }
        } else {
            if let Some(value) = textarea_value {
                chain.call("WriteValue", &value);
            }
            if !self_closing {
                let policy = if tag == "textarea" {
                    ChildPolicy::Textarea
                } else {
                    ChildPolicy::Normal
                };
                self.children_into(node, chain, policy)?;
            }
            chain.html("</");
            chain.html(tag);
            chain.html(">");
        }

        if is_svg {
            self.svg_depth -= 1;
        }
        Ok(())
    }

    /// `{ expr }` 的内容；空表达式或只有注释时为 `None`
    fn braced_content(&mut self, node: Node) -> RewriteResult<Option<String>> {
        let mut walker = node.walk();
        let named: Vec<Node> = node.named_children(&mut walker).collect();
        let Some(inner) = named.iter().find(|n| n.kind() != "comment") else {
            return Ok(None);
        };
        if inner.kind() == "spread_element" {
            return match inner.named_child(0) {
                Some(expr) => Ok(Some(format!("...{}", self.expr_text(expr)?))),
                None => Ok(None),
            };
        }
        let start = node.start_byte() + 1;
        let end = node.end_byte().saturating_sub(1).max(start);
        self.range_text(start, end, &named).map(Some)
    }

    /// 属性值表达式
    fn attribute_value(&mut self, value: Option<Node>) -> RewriteResult<Option<String>> {
        let Some(value) = value else {
            return Ok(Some("true".to_string()));
        };
        match value.kind() {
            "string" => {
                let raw = self.text(value);
                let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
                Ok(Some(js_string(inner)))
            }
            "jsx_expression" => self.braced_content(value),
            _ => self.jsx_expression(value).map(Some),
        }
    }

    fn attribute_nodes<'t>(open: Node<'t>) -> Vec<Node<'t>> {
        let mut walker = open.walk();
        let attributes: Vec<Node<'t>> = open
            .named_children(&mut walker)
            .filter(|n| matches!(n.kind(), "jsx_attribute" | "jsx_expression"))
            .collect();
        attributes
    }

    /// 输出元素属性，返回 textarea 的 value 表达式
    fn attributes_into(
        &mut self,
        open: Node,
        tag: &str,
        chain: &mut Chain,
    ) -> RewriteResult<Option<String>> {
        let mut textarea_value = None;
        let mut prev_end = open.start_byte();

        for attr in Self::attribute_nodes(open) {
            chain.lines(count_newlines(&self.src[prev_end..attr.start_byte()]));
            prev_end = attr.end_byte();

            if attr.kind() == "jsx_expression" {
                if let Some(spread) = self.braced_content(attr)? {
                    let bag = spread.strip_prefix("...").unwrap_or(&spread).to_string();
                    chain.html(" ");
                    chain.call("WriteAttributes", &bag);
                }
                continue;
            }

            let Some(name_node) = attr.named_child(0) else {
                continue;
            };
            let name = self.text(name_node);
            let value = attr.named_child(1);

            if tag == "textarea" && name == "value" {
                textarea_value = self.attribute_value(value)?;
                continue;
            }

            match value {
                None => chain.html(&format!(" {}", name)),
                Some(v) if v.kind() == "string" => {
                    chain.html(&template_escape(&format!(" {}={}", name, self.text(v))));
                }
                Some(_) => {
                    if let Some(expr) = self.attribute_value(value)? {
                        chain.html(" ");
                        chain.call("WriteAttribute", &format!("{}, {}", js_string(name), expr));
                    }
                }
            }
        }

        chain.lines(count_newlines(&self.src[prev_end.min(open.end_byte())..open.end_byte()]));
        Ok(textarea_value)
    }

    fn segments<'t>(&self, node: Node<'t>) -> Vec<Segment<'t>> {
        let mut segments = Vec::new();
        if node.kind() != "jsx_element" {
            return segments;
        }
        let start = opening(node).end_byte();
        let end = node
            .child_by_field_name("close_tag")
            .map(|c| c.start_byte())
            .unwrap_or(node.end_byte());

        let push_text = |segments: &mut Vec<Segment<'t>>, from: usize, to: usize| {
            if to > from {
                let raw = &self.src[from..to];
                segments.push(Segment::Text {
                    text: clean_jsx_text(raw),
                    newlines: count_newlines(raw),
                });
            }
        };

        let mut run_start = start;
        let mut walker = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut walker).collect();
        for child in children {
            if child.start_byte() < start || child.end_byte() > end {
                continue;
            }
            if !matches!(
                child.kind(),
                "jsx_expression" | "jsx_element" | "jsx_self_closing_element"
            ) {
                continue;
            }
            push_text(&mut segments, run_start, child.start_byte());
            segments.push(Segment::Node(child));
            run_start = child.end_byte();
        }
        push_text(&mut segments, run_start, end);
        segments
    }

    fn children_into(&mut self, node: Node, chain: &mut Chain, policy: ChildPolicy) -> RewriteResult<()> {
        for segment in self.segments(node) {
            match segment {
                Segment::Text { text, newlines } => {
                    if !text.trim().is_empty() {
                        match policy {
                            ChildPolicy::Void => return Err(self.void_child(node)),
                            ChildPolicy::Textarea => {
                                return Err(RewriteError::TextareaChild {
                                    line: Self::line(node),
                                })
                            }
                            ChildPolicy::Normal => chain.html(&template_escape(&text)),
                        }
                    } else if policy == ChildPolicy::Normal {
                        chain.html(&text);
                    }
                    chain.lines(newlines);
                }
                Segment::Node(child) if child.kind() == "jsx_expression" => {
                    match self.braced_content(child)? {
                        None => chain.lines(count_newlines(self.text(child))),
                        Some(expr) => {
                            if policy == ChildPolicy::Void {
                                return Err(self.void_child(node));
                            }
                            let expr = match expr.strip_prefix("...") {
                                Some(spread) => spread.to_string(),
                                None => expr,
                            };
                            chain.call("WriteValue", &expr);
                        }
                    }
                }
                Segment::Node(child) => {
                    match policy {
                        ChildPolicy::Void => return Err(self.void_child(node)),
                        ChildPolicy::Textarea => {
                            return Err(RewriteError::TextareaChild {
                                line: Self::line(node),
                            })
                        }
                        ChildPolicy::Normal => self.element_into(child, chain)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn void_child(&self, node: Node) -> RewriteError {
        let tag = opening(node)
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        RewriteError::VoidElementChild {
            tag,
            line: Self::line(node),
        }
    }

    /// 组件调用 `Name({...props, "children": ...})`
    fn component_call(&mut self, node: Node, name: &str) -> RewriteResult<String> {
        let mut props = Vec::new();

        for attr in Self::attribute_nodes(opening(node)) {
            if attr.kind() == "jsx_expression" {
                if let Some(spread) = self.braced_content(attr)? {
                    props.push(spread);
                }
                continue;
            }
            let Some(name_node) = attr.named_child(0) else {
                continue;
            };
            let key = js_string(self.text(name_node));
            let value = self
                .attribute_value(attr.named_child(1))?
                .unwrap_or_else(|| "undefined".to_string());
            props.push(format!("{}: {}", key, value));
        }

        let mut children = Vec::new();
        let mut force_array = false;
        for segment in self.segments(node) {
            match segment {
                Segment::Text { text, .. } => {
                    if !text.is_empty() {
                        children.push(format!(
                            "wax.Sub(w => w.WriteHTML(`{}`))",
                            template_escape(&text)
                        ));
                    }
                }
                Segment::Node(child) if child.kind() == "jsx_expression" => {
                    if let Some(expr) = self.braced_content(child)? {
                        force_array |= expr.starts_with("...");
                        children.push(expr);
                    }
                }
                Segment::Node(child) => children.push(self.jsx_expression(child)?),
            }
        }

        match children.len() {
            0 => {}
            1 if !force_array => props.push(format!("\"children\": {}", children[0])),
            _ => props.push(format!("\"children\": [{}]", children.join(", "))),
        }

        let callee = self.component_callee(node, name);
        Ok(format!("{}({{{}}})", callee, props.join(", ")))
    }

    /// 组件名（或 `A.B` 的首段）是具名导入时改为实时读取
    fn component_callee(&self, node: Node, name: &str) -> String {
        let (head, rest) = match name.find('.') {
            Some(dot) => name.split_at(dot),
            None => (name, ""),
        };
        match self.live_binding(node, head) {
            Some(live) => format!("{}{}", live, rest),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::clean_jsx_text;
    use crate::compiler::rewriter::{rewrite, RewriteError};

    fn script(source: &str) -> String {
        rewrite("/test.jsx", source).unwrap().script
    }

    #[test]
    fn test_clean_jsx_text() {
        assert_eq!(clean_jsx_text("Hello "), "Hello ");
        assert_eq!(clean_jsx_text("\n   Hello\n   world\n"), "Hello world");
        assert_eq!(clean_jsx_text("\n    \n  "), "");
        assert_eq!(clean_jsx_text("  "), "  ");
        assert_eq!(clean_jsx_text(" "), " ");
        assert_eq!(clean_jsx_text("\ta"), " a");
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            script(r#"const a = <p class="x">Hi {name}!</p>;"#),
            r#"const a = wax.Sub(w => w.WriteHTML(`<p class="x">Hi `).WriteValue(name).WriteHTML(`!</p>`));"#
        );
    }

    #[test]
    fn test_dynamic_attribute_and_spread() {
        assert_eq!(
            script("const a = <div id={id} {...rest}></div>;"),
            r#"const a = wax.Sub(w => w.WriteHTML(`<div `).WriteAttribute("id", id).WriteHTML(` `).WriteAttributes(rest).WriteHTML(`></div>`));"#
        );
    }

    #[test]
    fn test_boolean_attribute() {
        assert_eq!(
            script("const a = <input disabled />;"),
            "const a = wax.Sub(w => w.WriteHTML(`<input disabled>`));"
        );
    }

    #[test]
    fn test_self_closing_non_void_expands() {
        let out = rewrite("/v.jsx", "const a = <div />;").unwrap();
        assert_eq!(out.script, "const a = wax.Sub(w => w.WriteHTML(`<div></div>`));");
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("/v.jsx:1:"));
    }

    #[test]
    fn test_no_warnings_inside_svg_and_custom_tags() {
        let out = rewrite("/v.jsx", r#"const a = <svg><path d="M0" /></svg>; const b = <my-el />;"#).unwrap();
        assert!(out.warnings.is_empty());
        assert!(out.script.contains("<path d=\"M0\"></path>"));
        assert!(out.script.contains("<my-el></my-el>"));
    }

    #[test]
    fn test_nested_elements_and_lines() {
        let source = "const a = (\n  <ul>\n    <li>{x}</li>\n  </ul>\n);\nfoo();";
        let out = script(source);
        assert_eq!(out.lines().count(), source.lines().count());
        assert!(out.ends_with("\n);\nfoo();"));
        assert!(out.contains(".WriteValue(x)"));
        assert!(out.contains("<ul><li>"));
    }

    #[test]
    fn test_fragment() {
        assert_eq!(
            script("const a = <><b>1</b>{y}</>;"),
            "const a = wax.Sub(w => w.WriteHTML(`<b>1</b>`).WriteValue(y));"
        );
    }

    #[test]
    fn test_comment_child_ignored() {
        assert_eq!(
            script("const a = <p>{/* note */}</p>;"),
            "const a = wax.Sub(w => w.WriteHTML(`<p></p>`));"
        );
    }

    #[test]
    fn test_template_characters_escaped() {
        assert_eq!(
            script(r#"const a = <p title="`${x}`">a`b</p>;"#),
            r#"const a = wax.Sub(w => w.WriteHTML(`<p title="\`\${x}\`">a\`b</p>`));"#
        );
    }

    #[test]
    fn test_component_props() {
        assert_eq!(
            script(r#"const a = <Card title="t" open n={1} {...rest} />;"#),
            r#"const a = wax.Sub(w => w.WriteValue(Card({"title": "t", "open": true, "n": 1, ...rest})));"#
        );
    }

    #[test]
    fn test_component_children() {
        assert_eq!(
            script("const a = <Card>\n  body\n</Card>;"),
            "const a = wax.Sub(w => w.WriteValue(Card({\"children\": wax.Sub(w => w.WriteHTML(`body`))})))\n\n;"
        );
        assert_eq!(
            script("const a = <Card><b /> {x}</Card>;"),
            "const a = wax.Sub(w => w.WriteValue(Card({\"children\": [wax.Sub(w => w.WriteHTML(`<b></b>`)), wax.Sub(w => w.WriteHTML(` `)), x]})));"
        );
    }

    #[test]
    fn test_component_keeps_inline_space_between_children() {
        assert_eq!(
            script("const a = <Card>{a} {b}</Card>;"),
            "const a = wax.Sub(w => w.WriteValue(Card({\"children\": [a, wax.Sub(w => w.WriteHTML(` `)), b]})));"
        );
        assert_eq!(
            script("const a = <Card>\n  {a}\n</Card>;"),
            "const a = wax.Sub(w => w.WriteValue(Card({\"children\": a})))\n\n;"
        );
    }

    #[test]
    fn test_inline_space_between_element_children() {
        assert_eq!(
            script("const a = <p>{a} {b}</p>;"),
            "const a = wax.Sub(w => w.WriteHTML(`<p>`).WriteValue(a).WriteHTML(` `).WriteValue(b).WriteHTML(`</p>`));"
        );
    }

    #[test]
    fn test_component_inside_element() {
        assert_eq!(
            script("const a = <div><Nav active /></div>;"),
            r#"const a = wax.Sub(w => w.WriteHTML(`<div>`).WriteValue(Nav({"active": true})).WriteHTML(`</div>`));"#
        );
    }

    #[test]
    fn test_jsx_inside_expression_child() {
        let out = script("const a = <ul>{items.map(i => <li>{i}</li>)}</ul>;");
        assert!(out.contains(".WriteValue(items.map(i => wax.Sub(w => w.WriteHTML(`<li>`).WriteValue(i).WriteHTML(`</li>`))))"));
    }

    #[test]
    fn test_textarea_value() {
        assert_eq!(
            script("const a = <textarea rows=\"2\" value={v} />;"),
            "const a = wax.Sub(w => w.WriteHTML(`<textarea rows=\"2\">`).WriteValue(v).WriteHTML(`</textarea>`));"
        );
        assert_eq!(
            script(r#"const a = <textarea value="a<b" />;"#),
            r#"const a = wax.Sub(w => w.WriteHTML(`<textarea>`).WriteValue("a<b").WriteHTML(`</textarea>`));"#
        );
    }

    #[test]
    fn test_textarea_child_is_error() {
        let err = rewrite("/a.jsx", "const a = <textarea>text</textarea>;").unwrap_err();
        assert_eq!(err.to_string(), "textarea should not have child. Use value attribute.");
        assert!(rewrite("/a.jsx", "const a = <textarea>{v}</textarea>;").is_ok());
    }

    #[test]
    fn test_void_element_child_is_error() {
        let err = rewrite("/a.jsx", "const a = <img src={x}>child</img>;").unwrap_err();
        assert!(matches!(err, RewriteError::VoidElementChild { .. }));
        assert_eq!(err.to_string(), "invalid: void element with child");
    }

    #[test]
    fn test_void_element_pair_has_no_close_tag() {
        let out = rewrite("/a.jsx", "const a = <br></br>;").unwrap();
        assert_eq!(out.script, "const a = wax.Sub(w => w.WriteHTML(`<br>`));");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_namespaced_tag_unsupported() {
        let err = rewrite("/a.jsx", "const a = <svg:rect />;").unwrap_err();
        assert_eq!(err, RewriteError::Unsupported("jsx_namespace_name".to_string()));
    }

    #[test]
    fn test_imported_component_reads_record() {
        let out = script("import { Card, UI } from './c';\nconst a = <Card><UI.Icon /></Card>;");
        assert_eq!(
            out,
            "const __wax_import0 = module.do_import(\"./c\");\nconst a = wax.Sub(w => w.WriteValue(__wax_import0.exports.Card({\"children\": wax.Sub(w => w.WriteValue(__wax_import0.exports.UI.Icon({})))})));"
        );
        let out = script("import { Card } from './c';\nconst f = (Card) => <Card />;");
        assert!(out.ends_with("const f = (Card) => wax.Sub(w => w.WriteValue(Card({})));"));
    }

    #[test]
    fn test_member_component() {
        assert_eq!(
            script("const a = <UI.Button />;"),
            "const a = wax.Sub(w => w.WriteValue(UI.Button({})));"
        );
    }
}
