//! 词法作用域查询
//!
//! 具名导入改写为对模块记录的实时读取，引用处需要判断名字是否被内层声明遮蔽。
//! 这里只识别会引入绑定的语法：函数参数、块内的 let / const / class / function、
//! 函数体内的 var、for 头部声明和 catch 参数。

use tree_sitter::Node;

/// `node` 处的 `name` 是否被某个内层作用域重新声明
pub(crate) fn is_shadowed(node: Node, name: &str, src: &str) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() == "program" {
            return false;
        }
        let mut names = Vec::new();
        declared_names(parent, src, &mut names);
        if names.iter().any(|n| n == name) {
            return true;
        }
        current = parent;
    }
    false
}

fn is_function(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "generator_function_declaration"
            | "arrow_function"
            | "method_definition"
    )
}

/// 作用域节点自身引入的名字
fn declared_names(scope: Node, src: &str, names: &mut Vec<String>) {
    let kind = scope.kind();
    if is_function(kind) {
        if matches!(kind, "function_expression" | "function" | "generator_function") {
            if let Some(name) = scope.child_by_field_name("name") {
                names.push(src[name.start_byte()..name.end_byte()].to_string());
            }
        }
        if let Some(param) = scope.child_by_field_name("parameter") {
            pattern_names(param, src, names);
        }
        if let Some(params) = scope.child_by_field_name("parameters") {
            let mut walker = params.walk();
            for param in params.named_children(&mut walker) {
                let pattern = match param.kind() {
                    "required_parameter" | "optional_parameter" => param.child_by_field_name("pattern"),
                    _ => Some(param),
                };
                if let Some(pattern) = pattern {
                    pattern_names(pattern, src, names);
                }
            }
        }
        if let Some(body) = scope.child_by_field_name("body") {
            if body.kind() == "statement_block" {
                var_names(body, src, names);
            }
        }
        return;
    }

    match kind {
        "statement_block" | "switch_case" | "switch_default" | "class_static_block" => {
            let mut walker = scope.walk();
            for child in scope.named_children(&mut walker) {
                block_names(child, src, names);
            }
        }
        "for_statement" => {
            if let Some(init) = scope.child_by_field_name("initializer") {
                declarator_names(init, src, names);
            }
        }
        "for_in_statement" => {
            if scope.child_by_field_name("kind").is_some() {
                if let Some(left) = scope.child_by_field_name("left") {
                    pattern_names(left, src, names);
                }
            }
        }
        "catch_clause" => {
            if let Some(param) = scope.child_by_field_name("parameter") {
                pattern_names(param, src, names);
            }
        }
        _ => {}
    }
}

/// 块内语句直接声明的名字
fn block_names(statement: Node, src: &str, names: &mut Vec<String>) {
    match statement.kind() {
        "lexical_declaration" | "variable_declaration" => declarator_names(statement, src, names),
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration" => {
            if let Some(name) = statement.child_by_field_name("name") {
                names.push(src[name.start_byte()..name.end_byte()].to_string());
            }
        }
        _ => {}
    }
}

fn declarator_names(declaration: Node, src: &str, names: &mut Vec<String>) {
    if !matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
        return;
    }
    let mut walker = declaration.walk();
    for declarator in declaration.named_children(&mut walker) {
        if let Some(name) = declarator.child_by_field_name("name") {
            pattern_names(name, src, names);
        }
    }
}

/// 函数体内任意深度的 var 声明，不进入嵌套函数
fn var_names(node: Node, src: &str, names: &mut Vec<String>) {
    let mut walker = node.walk();
    let children: Vec<Node> = node.named_children(&mut walker).collect();
    for child in children {
        if is_function(child.kind()) {
            continue;
        }
        if child.kind() == "variable_declaration" {
            declarator_names(child, src, names);
        }
        var_names(child, src, names);
    }
}

/// 收集解构模式中绑定的变量名
pub(crate) fn pattern_names(node: Node, src: &str, names: &mut Vec<String>) {
    let text = || src[node.start_byte()..node.end_byte()].to_string();
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => names.push(text()),
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_names(value, src, names);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(left, src, names);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut walker = node.walk();
            let children: Vec<Node> = node.named_children(&mut walker).collect();
            for child in children {
                pattern_names(child, src, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    /// 源码中第 `nth` 个名为 `name` 的标识符是否被遮蔽
    fn shadowed(source: &str, name: &str, nth: usize) -> bool {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();

        let mut found = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "identifier" && &source[node.byte_range()] == name {
                found.push(node);
            }
            let mut walker = node.walk();
            stack.extend(node.children(&mut walker));
        }
        found.sort_by_key(|n| n.start_byte());
        is_shadowed(found[nth], name, source)
    }

    #[test]
    fn test_top_level_reference_not_shadowed() {
        assert!(!shadowed("const x = a + 1;", "a", 0));
        assert!(!shadowed("function f() { return a }", "a", 0));
    }

    #[test]
    fn test_parameters_shadow() {
        assert!(shadowed("function f(a) { return a }", "a", 1));
        assert!(shadowed("const f = a => a;", "a", 1));
        assert!(shadowed("const f = ({ b: [a] }, c = 1) => a;", "a", 1));
        assert!(shadowed("const f = (x: string, a?: number) => a;", "a", 1));
    }

    #[test]
    fn test_block_declarations_shadow() {
        assert!(shadowed("{ const a = 1; use(a) }", "a", 1));
        assert!(shadowed("function f() { use(a); function a() {} }", "a", 0));
        assert!(!shadowed("{ const b = 1; use(a) }", "a", 0));
    }

    #[test]
    fn test_var_hoists_to_function() {
        assert!(shadowed("function f() { if (x) { var a = 1 } return a }", "a", 1));
        assert!(!shadowed("function f() { g(() => { var a = 1 }); return a }", "a", 1));
    }

    #[test]
    fn test_loop_and_catch_bindings() {
        assert!(shadowed("for (const a of xs) use(a);", "a", 1));
        assert!(!shadowed("for (a of xs) use(a);", "a", 1));
        assert!(shadowed("for (let a = 0; a < 3; a++) {}", "a", 1));
        assert!(shadowed("try {} catch (a) { use(a) }", "a", 1));
    }
}
