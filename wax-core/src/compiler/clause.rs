//! import / export 子句解析器
//!
//! 只解析子句本身的形状（绑定名、别名、模块说明符），不关心语句之外的上下文。
//! 重写器把 tree-sitter 节点的原始文本交给这里，再按结果生成脚本。
//!
//! ```text
//! import Nav, { Item as NavItem } from "./Nav";
//! export { a, b as c } from "./mod";
//! export * as ns from "./mod";
//! ```

use thiserror::Error;

/// 子句解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClauseError {
    /// 不是 import / export 子句
    #[error("not an import or export clause")]
    NotAClause,
    /// 无法识别的字符
    #[error("unexpected character '{0}' in clause")]
    UnexpectedChar(char),
    /// 字符串没有闭合
    #[error("unterminated string literal in clause")]
    UnterminatedString,
    /// 花括号没有闭合
    #[error("unterminated braces in clause")]
    UnterminatedBraces,
    /// `import {} from "m"`
    #[error("empty braces in import clause")]
    EmptyBraces,
    /// 缺少 `from "m"`
    #[error("missing module specifier")]
    MissingSpecifier,
    /// 其他语法错误
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
}

/// 子句类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Import,
    Export,
}

/// 一个具名绑定
///
/// import 时 `imported` 是对方模块导出的名字，`local` 是本地变量名；
/// export 时 `imported` 是本模块内的名字（或被转导出模块的导出名），
/// `local` 是对外导出的名字。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinding {
    pub imported: String,
    pub local: String,
}

/// 解析后的子句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub kind: ClauseKind,
    /// `import X from`
    pub default_binding: Option<String>,
    /// `import * as N from` / `export * as N from`
    pub namespace: Option<String>,
    /// 具名绑定，保持源码顺序
    pub named: Vec<NamedBinding>,
    /// 模块说明符
    pub specifier: Option<String>,
    /// `import type` / `export type`
    pub type_only: bool,
    /// `export * from`
    pub star: bool,
}

impl Clause {
    fn new(kind: ClauseKind) -> Self {
        Self {
            kind,
            default_binding: None,
            namespace: None,
            named: Vec::new(),
            specifier: None,
            type_only: false,
            star: false,
        }
    }

    /// 所有绑定到默认导出的本地名（含 `{ default as X }`）
    pub fn default_bindings(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.default_binding.iter().map(String::as_str).collect();
        if self.kind == ClauseKind::Import {
            names.extend(
                self.named
                    .iter()
                    .filter(|b| b.imported == "default")
                    .map(|b| b.local.as_str()),
            );
        }
        names
    }

    /// 去掉 `default` 之后的具名绑定
    pub fn named_bindings(&self) -> impl Iterator<Item = &NamedBinding> {
        let kind = self.kind;
        self.named
            .iter()
            .filter(move |b| kind == ClauseKind::Export || b.imported != "default")
    }

    /// 只有模块说明符，没有任何绑定
    pub fn is_side_effect(&self) -> bool {
        self.default_binding.is_none()
            && self.namespace.is_none()
            && self.named.is_empty()
            && !self.star
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LBrace,
    RBrace,
    Star,
    Comma,
    Semi,
    /// 其余单个字符，如 import 属性里的 `:`
    Punct(char),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Str(value) => format!("string \"{}\"", value),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Semi => "';'".to_string(),
            Token::Punct(c) => format!("'{}'", c),
        }
    }

    fn is_ident(&self, word: &str) -> bool {
        matches!(self, Token::Ident(name) if name == word)
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}

/// 词法错误之前的记号，以及错误本身
fn tokenize(text: &str) -> (Vec<Token>, Option<ClauseError>) {
    let mut tokens = Vec::new();
    match lex(text, &mut tokens) {
        Ok(()) => (tokens, None),
        Err(err) => (tokens, Some(err)),
    }
}

fn lex(text: &str, tokens: &mut Vec<Token>) -> Result<(), ClauseError> {
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                match chars.peek() {
                    Some('/') => {
                        for c in chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = '\0';
                        for c in chars.by_ref() {
                            if prev == '*' && c == '/' {
                                break;
                            }
                            prev = c;
                        }
                    }
                    _ => tokens.push(Token::Punct('/')),
                }
            }
            '{' | '}' | '*' | ',' | ';' => {
                chars.next();
                tokens.push(match c {
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '*' => Token::Star,
                    ',' => Token::Comma,
                    _ => Token::Semi,
                });
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other) => value.push(other),
                            None => break,
                        },
                        '\n' => break,
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(ClauseError::UnterminatedString);
                }
                tokens.push(Token::Str(value));
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_ident_part(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token::Ident(name));
            }
            other => {
                chars.next();
                tokens.push(Token::Punct(other));
            }
        }
    }

    Ok(())
}

struct ClauseParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ClauseParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> ClauseError {
        if let Some(Token::Punct(c)) = self.peek() {
            return ClauseError::UnexpectedChar(*c);
        }
        ClauseError::Unexpected {
            expected,
            found: self
                .peek()
                .map(Token::describe)
                .unwrap_or_else(|| "end of clause".to_string()),
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String, ClauseError> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.next() {
                Some(Token::Ident(name)) => Ok(name),
                _ => Err(self.unexpected(expected)),
            },
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_keyword(&mut self, word: &'static str) -> Result<(), ClauseError> {
        match self.peek() {
            Some(token) if token.is_ident(word) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(word)),
        }
    }

    /// `from "m"`
    fn from_specifier(&mut self) -> Result<String, ClauseError> {
        match self.peek() {
            Some(token) if token.is_ident("from") => {
                self.pos += 1;
            }
            None => return Err(ClauseError::MissingSpecifier),
            _ => return Err(self.unexpected("from")),
        }
        match self.next() {
            Some(Token::Str(specifier)) => Ok(specifier),
            _ => Err(ClauseError::MissingSpecifier),
        }
    }

    /// 说明符之后只允许 `;` 或 import 属性（`with { ... }` / `assert { ... }`）
    fn finish(&mut self) -> Result<(), ClauseError> {
        if matches!(self.peek(), Some(t) if t.is_ident("with") || t.is_ident("assert")) {
            self.pos += 1;
            self.skip_attributes()?;
        }
        match self.peek() {
            None | Some(Token::Semi) => Ok(()),
            _ => Err(self.unexpected("';'")),
        }
    }

    /// 属性内容不影响模块加载，只检查花括号配对
    fn skip_attributes(&mut self) -> Result<(), ClauseError> {
        if self.peek() != Some(&Token::LBrace) {
            return Err(self.unexpected("'{'"));
        }
        let mut depth = 0usize;
        loop {
            match self.next() {
                None => return Err(ClauseError::UnterminatedBraces),
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// `{ a, b as c, type T, default as d }`，返回绑定以及是否含有被丢弃的 type 项
    fn named_list(&mut self) -> Result<(Vec<NamedBinding>, bool), ClauseError> {
        // 调用方已确认当前是 '{'
        self.pos += 1;
        let mut named = Vec::new();
        let mut dropped_types = false;

        loop {
            match self.peek() {
                None => return Err(ClauseError::UnterminatedBraces),
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }

            // `type T` 是内联类型标记，`type` / `type as x` 是普通绑定
            let inline_type = matches!(self.peek(), Some(t) if t.is_ident("type"))
                && match self.peek_at(1) {
                    Some(Token::Ident(next)) => next != "as",
                    Some(Token::Str(_)) => true,
                    _ => false,
                };
            if inline_type {
                self.pos += 1;
            }

            let imported = match self.next() {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => name,
                None => return Err(ClauseError::UnterminatedBraces),
                Some(other) => {
                    return Err(ClauseError::Unexpected {
                        expected: "binding name",
                        found: other.describe(),
                    })
                }
            };

            let local = if matches!(self.peek(), Some(t) if t.is_ident("as")) {
                self.pos += 1;
                match self.next() {
                    Some(Token::Ident(name)) | Some(Token::Str(name)) => name,
                    None => return Err(ClauseError::UnterminatedBraces),
                    Some(other) => {
                        return Err(ClauseError::Unexpected {
                            expected: "alias name",
                            found: other.describe(),
                        })
                    }
                }
            } else {
                imported.clone()
            };

            if inline_type {
                dropped_types = true;
            } else {
                named.push(NamedBinding { imported, local });
            }

            match self.peek() {
                Some(Token::Comma) => {
                    self.pos += 1;
                }
                Some(Token::RBrace) => {}
                None => return Err(ClauseError::UnterminatedBraces),
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }

        Ok((named, dropped_types))
    }

    fn parse_import(&mut self) -> Result<Clause, ClauseError> {
        let mut clause = Clause::new(ClauseKind::Import);

        // import "m"
        if let Some(Token::Str(_)) = self.peek() {
            if let Some(Token::Str(specifier)) = self.next() {
                clause.specifier = Some(specifier);
            }
            self.finish()?;
            return Ok(clause);
        }

        // `import type from "m"` 与 `import type, {..}` 中的 type 是默认绑定名
        if matches!(self.peek(), Some(t) if t.is_ident("type"))
            && !matches!(self.peek_at(1), Some(t) if t.is_ident("from"))
            && !matches!(self.peek_at(1), Some(Token::Comma))
        {
            self.pos += 1;
            clause.type_only = true;
        }

        let mut expect_more = true;
        if let Some(Token::Ident(_)) = self.peek() {
            if !matches!(self.peek(), Some(t) if t.is_ident("from")) || self.is_default_named_from() {
                clause.default_binding = Some(self.expect_ident("default binding")?);
                match self.peek() {
                    Some(Token::Comma) => {
                        self.pos += 1;
                    }
                    _ => expect_more = false,
                }
            }
        }

        if expect_more {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    self.expect_keyword("as")?;
                    clause.namespace = Some(self.expect_ident("namespace name")?);
                }
                Some(Token::LBrace) => {
                    let (named, dropped_types) = self.named_list()?;
                    if named.is_empty() && !dropped_types {
                        return Err(ClauseError::EmptyBraces);
                    }
                    if named.is_empty() && clause.default_binding.is_none() {
                        clause.type_only = true;
                    }
                    clause.named = named;
                }
                _ => return Err(self.unexpected("import bindings")),
            }
        }

        clause.specifier = Some(self.from_specifier()?);
        self.finish()?;
        Ok(clause)
    }

    /// `import from from "m"`：名为 from 的默认绑定
    fn is_default_named_from(&self) -> bool {
        matches!(self.peek_at(1), Some(t) if t.is_ident("from"))
    }

    fn parse_export(&mut self) -> Result<Clause, ClauseError> {
        let mut clause = Clause::new(ClauseKind::Export);

        if matches!(self.peek(), Some(t) if t.is_ident("type")) {
            self.pos += 1;
            clause.type_only = true;
        }

        match self.peek() {
            Some(Token::Star) => {
                self.pos += 1;
                clause.star = true;
                if matches!(self.peek(), Some(t) if t.is_ident("as")) {
                    self.pos += 1;
                    clause.namespace = match self.next() {
                        Some(Token::Ident(name)) | Some(Token::Str(name)) => Some(name),
                        _ => return Err(self.unexpected("namespace name")),
                    };
                }
                clause.specifier = Some(self.from_specifier()?);
            }
            Some(Token::LBrace) => {
                let (named, dropped_types) = self.named_list()?;
                if named.is_empty() && dropped_types {
                    clause.type_only = true;
                }
                clause.named = named;
                if self.peek().is_some_and(|t| t.is_ident("from")) {
                    clause.specifier = Some(self.from_specifier()?);
                }
            }
            _ => return Err(self.unexpected("'{' or '*'")),
        }

        self.finish()?;
        Ok(clause)
    }
}

/// 解析一条 import 或 export 子句的原始文本
pub fn parse_clause(text: &str) -> Result<Clause, ClauseError> {
    let (tokens, lex_error) = tokenize(text);
    let mut parser = ClauseParser { tokens, pos: 0 };

    let kind = match parser.next() {
        Some(token) if token.is_ident("import") => ClauseKind::Import,
        Some(token) if token.is_ident("export") => ClauseKind::Export,
        _ => return Err(ClauseError::NotAClause),
    };
    if let Some(err) = lex_error {
        return Err(err);
    }
    match kind {
        ClauseKind::Import => parser.parse_import(),
        ClauseKind::Export => parser.parse_export(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, &str)]) -> Vec<NamedBinding> {
        pairs
            .iter()
            .map(|(imported, local)| NamedBinding {
                imported: imported.to_string(),
                local: local.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_side_effect_import() {
        let clause = parse_clause(r#"import "./polyfill";"#).unwrap();
        assert_eq!(clause.specifier.as_deref(), Some("./polyfill"));
        assert!(clause.is_side_effect());
    }

    #[test]
    fn test_default_import() {
        let clause = parse_clause("import Nav from './Nav'").unwrap();
        assert_eq!(clause.default_binding.as_deref(), Some("Nav"));
        assert_eq!(clause.specifier.as_deref(), Some("./Nav"));
        assert!(clause.named.is_empty());
    }

    #[test]
    fn test_namespace_import() {
        let clause = parse_clause(r#"import * as utils from "./utils.jsx";"#).unwrap();
        assert_eq!(clause.namespace.as_deref(), Some("utils"));
        assert_eq!(clause.default_binding, None);
    }

    #[test]
    fn test_named_with_alias() {
        let clause = parse_clause(r#"import { a, b as c, } from "./m""#).unwrap();
        assert_eq!(clause.named, named(&[("a", "a"), ("b", "c")]));
    }

    #[test]
    fn test_default_and_named() {
        let clause = parse_clause(r#"import D, { x } from "./m";"#).unwrap();
        assert_eq!(clause.default_binding.as_deref(), Some("D"));
        assert_eq!(clause.named, named(&[("x", "x")]));
    }

    #[test]
    fn test_default_and_namespace() {
        let clause = parse_clause(r#"import D, * as all from "./m";"#).unwrap();
        assert_eq!(clause.default_binding.as_deref(), Some("D"));
        assert_eq!(clause.namespace.as_deref(), Some("all"));
    }

    #[test]
    fn test_default_in_named_list() {
        let clause = parse_clause(r#"import { default as Simple, helper } from "./module1""#).unwrap();
        assert_eq!(clause.default_bindings(), vec!["Simple"]);
        let rest: Vec<_> = clause.named_bindings().map(|b| b.local.as_str()).collect();
        assert_eq!(rest, vec!["helper"]);
    }

    #[test]
    fn test_import_type_only() {
        let clause = parse_clause(r#"import type { Props } from "./types""#).unwrap();
        assert!(clause.type_only);
        assert_eq!(clause.named, named(&[("Props", "Props")]));
    }

    #[test]
    fn test_default_binding_named_type() {
        let clause = parse_clause(r#"import type from "./t""#).unwrap();
        assert!(!clause.type_only);
        assert_eq!(clause.default_binding.as_deref(), Some("type"));
    }

    #[test]
    fn test_inline_type_items_dropped() {
        let clause = parse_clause(r#"import { type T, a } from "./m""#).unwrap();
        assert_eq!(clause.named, named(&[("a", "a")]));
        assert!(!clause.type_only);

        let clause = parse_clause(r#"import { type T } from "./m""#).unwrap();
        assert!(clause.named.is_empty());
        assert!(clause.type_only);
    }

    #[test]
    fn test_binding_named_type() {
        let clause = parse_clause(r#"import { type, type as kind } from "./m""#).unwrap();
        assert_eq!(clause.named, named(&[("type", "type"), ("type", "kind")]));
    }

    #[test]
    fn test_comments_are_skipped() {
        let clause = parse_clause("import /* nav */ Nav // trailing\n from './Nav'").unwrap();
        assert_eq!(clause.default_binding.as_deref(), Some("Nav"));
    }

    #[test]
    fn test_import_attributes_ignored() {
        let clause = parse_clause(r#"import data from "./d.json" with { type: "json" };"#).unwrap();
        assert_eq!(clause.specifier.as_deref(), Some("./d.json"));
        assert_eq!(clause.default_binding.as_deref(), Some("data"));

        let clause = parse_clause(r#"import { a } from "./d.json" assert { type: 'json' }"#).unwrap();
        assert_eq!(clause.named, named(&[("a", "a")]));

        let clause = parse_clause(r#"import "./style.css" with { type: "css" }"#).unwrap();
        assert!(clause.is_side_effect());

        let clause = parse_clause(r#"export { a } from "./d.json" with { type: "json" };"#).unwrap();
        assert_eq!(clause.specifier.as_deref(), Some("./d.json"));
    }

    #[test]
    fn test_malformed_import_attributes() {
        assert_eq!(
            parse_clause(r#"import d from "./d.json" with { type: "json""#),
            Err(ClauseError::UnterminatedBraces)
        );
        assert!(matches!(
            parse_clause(r#"import d from "./d.json" with type"#),
            Err(ClauseError::Unexpected { expected: "'{'", .. })
        ));
        assert_eq!(
            parse_clause(r#"import d from "./d.json" with { type: "json" } x"#),
            Err(ClauseError::Unexpected {
                expected: "';'",
                found: "'x'".to_string()
            })
        );
    }

    #[test]
    fn test_non_clauses() {
        assert_eq!(parse_clause("const a = 1"), Err(ClauseError::NotAClause));
        assert_eq!(parse_clause("a.b = 'x"), Err(ClauseError::NotAClause));
        assert_eq!(parse_clause("@decorator"), Err(ClauseError::NotAClause));
        assert_eq!(parse_clause(""), Err(ClauseError::NotAClause));
    }

    #[test]
    fn test_export_named() {
        let clause = parse_clause("export { a, b as c };").unwrap();
        assert_eq!(clause.kind, ClauseKind::Export);
        assert_eq!(clause.named, named(&[("a", "a"), ("b", "c")]));
        assert_eq!(clause.specifier, None);
    }

    #[test]
    fn test_export_empty_braces_allowed() {
        let clause = parse_clause("export {};").unwrap();
        assert!(clause.named.is_empty());
        assert!(!clause.type_only);
    }

    #[test]
    fn test_reexport() {
        let clause = parse_clause(r#"export { a as b, default } from "./m""#).unwrap();
        assert_eq!(clause.named, named(&[("a", "b"), ("default", "default")]));
        assert_eq!(clause.specifier.as_deref(), Some("./m"));
    }

    #[test]
    fn test_export_star() {
        let clause = parse_clause(r#"export * from "./m";"#).unwrap();
        assert!(clause.star);
        assert_eq!(clause.namespace, None);

        let clause = parse_clause(r#"export * as ns from "./m";"#).unwrap();
        assert!(clause.star);
        assert_eq!(clause.namespace.as_deref(), Some("ns"));
    }

    #[test]
    fn test_export_type() {
        let clause = parse_clause(r#"export type { T } from "./m""#).unwrap();
        assert!(clause.type_only);
    }

    #[test]
    fn test_escaped_specifier() {
        let clause = parse_clause(r#"import a from './it\'s'"#).unwrap();
        assert_eq!(clause.specifier.as_deref(), Some("./it's"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_clause(r#"import {} from "./m""#), Err(ClauseError::EmptyBraces));
        assert_eq!(parse_clause("import a"), Err(ClauseError::MissingSpecifier));
        assert_eq!(parse_clause("import a from"), Err(ClauseError::MissingSpecifier));
        assert_eq!(parse_clause("import { a, b"), Err(ClauseError::UnterminatedBraces));
        assert_eq!(parse_clause(r#"import a from "./m"#), Err(ClauseError::UnterminatedString));
        assert_eq!(parse_clause("const a = 1"), Err(ClauseError::NotAClause));
        assert_eq!(parse_clause("import a from '@' + b"), Err(ClauseError::UnexpectedChar('+')));
        assert!(matches!(
            parse_clause("import { a b } from './m'"),
            Err(ClauseError::Unexpected { .. })
        ));
    }
}
