//! import / export 改写
//!
//! 所有模块语句都改写成一行，对原文中的换行用空行补齐。
//!
//! 具名导入不复制值：import 语句把模块记录存入一个变量，
//! 之后每处引用都改写为 `记录.exports.名字`，循环依赖中后赋值的导出也能读到。

use super::scope::{is_shadowed, pattern_names};
use super::{js_string, member, Cursor, RewriteError, RewriteResult, Rewriter};
use crate::compiler::clause::{parse_clause, Clause};
use tree_sitter::Node;

/// 给导出名赋值的目标：`default` 写入 `module.default`
fn export_target(name: &str) -> String {
    if name == "default" {
        "module.default".to_string()
    } else {
        member("module.exports", name)
    }
}

impl<'s> Rewriter<'s> {
    /// `module.do_import("m")`，同时记下说明符
    fn do_import(&mut self, specifier: &str) -> String {
        if !self.imports.iter().any(|s| s == specifier) {
            self.imports.push(specifier.to_string());
        }
        format!("module.do_import({})", js_string(specifier))
    }

    /// 预先登记顶层 import 的具名绑定，引用可能出现在 import 语句之前
    pub(crate) fn bind_imports(&mut self, root: Node) {
        let mut walker = root.walk();
        let statements: Vec<Node> = root
            .named_children(&mut walker)
            .filter(|n| n.kind() == "import_statement")
            .collect();
        for statement in statements {
            let Ok(clause) = parse_clause(self.text(statement)) else {
                continue;
            };
            if clause.type_only || clause.named_bindings().next().is_none() {
                continue;
            }
            let record = format!("__wax_import{}", self.records.len());
            for binding in clause.named_bindings() {
                let exports = format!("{}.exports", record);
                self.live
                    .insert(binding.local.clone(), member(&exports, &binding.imported));
            }
            self.records.insert(statement.start_byte(), record);
        }
    }

    /// `name` 在 `node` 处指向具名导入时，返回实时读取表达式
    pub(crate) fn live_binding(&self, node: Node, name: &str) -> Option<String> {
        let live = self.live.get(name)?;
        if is_shadowed(node, name, self.src) {
            return None;
        }
        Some(live.clone())
    }

    fn clause(&self, node: Node) -> RewriteResult<Clause> {
        parse_clause(self.text(node)).map_err(|source| RewriteError::Clause {
            line: Self::line(node),
            source,
        })
    }

    pub(crate) fn rewrite_import(&mut self, node: Node, cur: &mut Cursor) -> RewriteResult<()> {
        let mut walker = node.walk();
        if node
            .children(&mut walker)
            .any(|c| c.kind() == "import_require_clause")
        {
            return Err(RewriteError::Unsupported("import_require_clause".to_string()));
        }

        let clause = self.clause(node)?;
        if clause.type_only {
            cur.blank(node.start_byte(), node.end_byte());
            return Ok(());
        }
        let Some(specifier) = clause.specifier.as_deref() else {
            return Err(RewriteError::Clause {
                line: Self::line(node),
                source: crate::compiler::clause::ClauseError::MissingSpecifier,
            });
        };

        let mut import = self.do_import(specifier);
        let mut out = String::new();

        if let Some(record) = self.records.get(&node.start_byte()) {
            out.push_str(&format!("const {} = {};", record, import));
            import = record.clone();
        } else if clause.is_side_effect() {
            out.push_str(&format!("{};", import));
        }
        for name in clause.default_bindings() {
            let missing = js_string(&format!("no default export in '{}'", specifier));
            out.push_str(&format!(
                "const {} = ({}.default ?? (()=> {{throw {}}}));",
                name, import, missing
            ));
        }
        if let Some(namespace) = &clause.namespace {
            out.push_str(&format!("const {} = {}.exports;", namespace, import));
        }

        cur.replace(node.start_byte(), node.end_byte(), &out);
        Ok(())
    }

    pub(crate) fn rewrite_export(&mut self, node: Node, cur: &mut Cursor) -> RewriteResult<()> {
        let mut walker = node.walk();
        let children: Vec<Node> = node.children(&mut walker).collect();
        let has_token = |kind: &str| children.iter().any(|c| !c.is_named() && c.kind() == kind);

        if has_token("=") {
            return Err(RewriteError::Unsupported("export =".to_string()));
        }
        if has_token("namespace") {
            return Err(RewriteError::Unsupported("export as namespace".to_string()));
        }
        if has_token("type") {
            cur.blank(node.start_byte(), node.end_byte());
            return Ok(());
        }

        let is_default = has_token("default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            return self.export_declaration(node, declaration, is_default, cur);
        }

        if is_default {
            if let Some(value) = node.child_by_field_name("value") {
                cur.replace(node.start_byte(), value.start_byte(), "module.default = ");
                return self.visit(value, cur);
            }
        }

        // export { .. } [from ..] / export * [as ns] from ..
        let clause = self.clause(node)?;
        if clause.type_only {
            cur.blank(node.start_byte(), node.end_byte());
            return Ok(());
        }

        let mut out = String::new();
        match clause.specifier.as_deref() {
            Some(specifier) => {
                let import = self.do_import(specifier);
                if clause.star {
                    match &clause.namespace {
                        Some(ns) => out.push_str(&format!(
                            "{} = {}.exports;",
                            export_target(ns),
                            import
                        )),
                        None => out.push_str(&format!(
                            "Object.assign(module.exports, {}.exports);",
                            import
                        )),
                    }
                }
                for binding in &clause.named {
                    let source = if binding.imported == "default" {
                        format!("{}.default", import)
                    } else {
                        member(&format!("{}.exports", import), &binding.imported)
                    };
                    out.push_str(&format!("{} = {};", export_target(&binding.local), source));
                }
            }
            None => {
                for binding in &clause.named {
                    let value = self
                        .live
                        .get(&binding.imported)
                        .cloned()
                        .unwrap_or_else(|| binding.imported.clone());
                    out.push_str(&format!("{} = {};", export_target(&binding.local), value));
                }
            }
        }

        cur.replace(node.start_byte(), node.end_byte(), &out);
        Ok(())
    }

    fn export_declaration(
        &mut self,
        statement: Node,
        declaration: Node,
        is_default: bool,
        cur: &mut Cursor,
    ) -> RewriteResult<()> {
        let name = declaration
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string());

        match declaration.kind() {
            "function_declaration" | "generator_function_declaration" => {
                cur.blank(statement.start_byte(), declaration.start_byte());
                if let Some(name) = &name {
                    let target = if is_default {
                        "module.default".to_string()
                    } else {
                        member("module.exports", name)
                    };
                    self.hoisted.push_str(&format!("{} = {}; ", target, name));
                }
                self.visit(declaration, cur)
            }
            "class_declaration" | "abstract_class_declaration" => {
                cur.blank(statement.start_byte(), declaration.start_byte());
                self.visit(declaration, cur)?;
                if let Some(name) = &name {
                    let target = if is_default {
                        "module.default".to_string()
                    } else {
                        member("module.exports", name)
                    };
                    cur.copy_to(statement.end_byte());
                    cur.push(&format!("; {} = {};", target, name));
                }
                Ok(())
            }
            "lexical_declaration" | "variable_declaration" => {
                cur.blank(statement.start_byte(), declaration.start_byte());
                self.export_variables(declaration, cur)?;
                cur.copy_to(statement.end_byte());
                Ok(())
            }
            "type_alias_declaration"
            | "interface_declaration"
            | "function_signature"
            | "ambient_declaration" => {
                cur.blank(statement.start_byte(), statement.end_byte());
                Ok(())
            }
            other => {
                if is_default {
                    cur.replace(statement.start_byte(), declaration.start_byte(), "module.default = ");
                    self.visit(declaration, cur)
                } else {
                    Err(RewriteError::Unsupported(other.to_string()))
                }
            }
        }
    }

    /// `export const a = 1, {b} = o` => `const a = module.exports.a = 1, {b} = o; module.exports.b = b;`
    fn export_variables(&mut self, declaration: Node, cur: &mut Cursor) -> RewriteResult<()> {
        let mut walker = declaration.walk();
        let children: Vec<Node> = declaration.children(&mut walker).collect();
        let mut trailing = Vec::new();

        for child in children {
            if child.kind() != "variable_declarator" {
                if child.is_named() {
                    self.visit(child, cur)?;
                }
                continue;
            }
            let Some(name) = child.child_by_field_name("name") else {
                self.visit(child, cur)?;
                continue;
            };
            match (name.kind(), child.child_by_field_name("value")) {
                ("identifier", Some(value)) => {
                    self.visit_children_until(child, value.start_byte(), cur)?;
                    cur.copy_to(value.start_byte());
                    cur.push(&format!("{} = ", member("module.exports", self.text(name))));
                    self.visit(value, cur)?;
                }
                _ => {
                    pattern_names(name, self.src, &mut trailing);
                    self.visit(child, cur)?;
                }
            }
        }

        cur.copy_to(declaration.end_byte());
        if !trailing.is_empty() {
            let assigns: Vec<String> = trailing
                .iter()
                .map(|n| format!("{} = {};", member("module.exports", n), n))
                .collect();
            let separator = if self.text(declaration).ends_with(';') { " " } else { "; " };
            cur.push(&format!("{}{}", separator, assigns.join(" ")));
        }
        Ok(())
    }

    /// 访问 `node` 中起始于 `end` 之前的子节点（类型注解等）
    fn visit_children_until(&mut self, node: Node, end: usize, cur: &mut Cursor) -> RewriteResult<()> {
        let mut walker = node.walk();
        let children: Vec<Node> = node.children(&mut walker).collect();
        for child in children {
            if child.start_byte() >= end {
                break;
            }
            if !child.is_named() && super::node::is_erased_token(node.kind(), child.kind()) {
                cur.blank(child.start_byte(), child.end_byte());
            } else if child.is_named() {
                self.visit(child, cur)?;
            }
        }
        Ok(())
    }
}
