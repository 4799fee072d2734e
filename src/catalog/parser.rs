//! Locale file syntaxes, looked up by file extension.

use std::fmt;

use serde_json::{
    Map,
    Number,
    Value,
};
use tree_sitter::{
    Language,
    Node,
    Parser,
};

use super::error::ParserError;

/// Reads a locale file into a nested object and writes it back.
pub trait LocaleParser: fmt::Debug + Send + Sync {
    /// Extensions handled, without the leading dot.
    fn extensions(&self) -> &[&'static str];

    /// Nested object held by `text`.
    fn parse(&self, text: &str) -> Result<Value, ParserError>;

    /// File text for a nested object.
    fn serialize(&self, value: &Value) -> Result<String, ParserError>;
}

/// Plain JSON locale files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl LocaleParser for JsonParser {
    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn parse(&self, text: &str) -> Result<Value, ParserError> {
        let value: Value = serde_json::from_str(text)?;
        if value.is_object() { Ok(value) } else { Err(ParserError::NotAnObject) }
    }

    fn serialize(&self, value: &Value) -> Result<String, ParserError> {
        let mut text = serde_json::to_string_pretty(value)?;
        text.push('\n');
        Ok(text)
    }
}

/// Module locale files: `export default { ... }` or `module.exports = { ... }`.
///
/// Written back with bare identifier keys and single-quoted strings.
#[derive(Debug, Clone, Copy)]
pub struct EsModuleParser {
    /// Parse with the TypeScript grammar.
    typescript: bool,
}

impl EsModuleParser {
    #[must_use]
    pub const fn javascript() -> Self {
        Self { typescript: false }
    }

    #[must_use]
    pub const fn typescript() -> Self {
        Self { typescript: true }
    }

    /// Grammar for this dialect.
    fn language(self) -> Language {
        if self.typescript {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        } else {
            tree_sitter_javascript::LANGUAGE.into()
        }
    }
}

impl LocaleParser for EsModuleParser {
    fn extensions(&self) -> &[&'static str] {
        if self.typescript { &["ts"] } else { &["js", "mjs", "cjs"] }
    }

    fn parse(&self, text: &str) -> Result<Value, ParserError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language())?;
        let tree = parser.parse(text, None).ok_or(ParserError::ParseFailed)?;

        let source = text.as_bytes();
        let object = find_exported_object(tree.root_node(), source).ok_or(ParserError::MissingExport)?;
        node_to_value(object, source)
    }

    fn serialize(&self, value: &Value) -> Result<String, ParserError> {
        if !value.is_object() {
            return Err(ParserError::NotAnObject);
        }
        let mut out = String::from("export default ");
        write_js_value(&mut out, value, 0);
        out.push('\n');
        Ok(out)
    }
}

/// Parsers known to the catalog.
#[derive(Debug)]
pub struct ParserRegistry {
    /// First match by extension wins.
    parsers: Vec<Box<dyn LocaleParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(JsonParser),
                Box::new(EsModuleParser::javascript()),
                Box::new(EsModuleParser::typescript()),
            ],
        }
    }

    /// Returns `None` for extensions no parser handles.
    #[must_use]
    pub fn for_extension(&self, ext: &str) -> Option<&dyn LocaleParser> {
        let ext = ext.trim_start_matches('.');
        self.parsers
            .iter()
            .find(|parser| parser.extensions().iter().any(|e| *e == ext))
            .map(|parser| &**parser)
    }
}

/// Named children without comments.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).filter(|child| child.kind() != "comment").collect()
}

/// Strips wrappers such as `( ... )`, `x as const` and `x satisfies T`.
fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    while matches!(
        node.kind(),
        "parenthesized_expression" | "as_expression" | "satisfies_expression"
    ) {
        let Some(inner) = named_children(node).into_iter().next() else {
            break;
        };
        node = inner;
    }
    node
}

/// Object literal behind `export default` or `module.exports =`.
fn find_exported_object<'tree>(root: Node<'tree>, source: &[u8]) -> Option<Node<'tree>> {
    for statement in named_children(root) {
        let candidate = match statement.kind() {
            "export_statement" => statement.child_by_field_name("value"),
            "expression_statement" => named_children(statement)
                .into_iter()
                .find(|expr| expr.kind() == "assignment_expression")
                .filter(|assign| {
                    assign
                        .child_by_field_name("left")
                        .and_then(|left| left.utf8_text(source).ok())
                        .is_some_and(|left| left == "module.exports")
                })
                .and_then(|assign| assign.child_by_field_name("right")),
            _ => None,
        };
        if let Some(node) = candidate.map(unwrap_expression)
            && node.kind() == "object"
        {
            return Some(node);
        }
    }
    None
}

/// Error for a node that is not static data.
fn unsupported(node: Node<'_>) -> ParserError {
    ParserError::UnsupportedValue { kind: node.kind().to_string(), offset: node.start_byte() }
}

/// Source text of `node`.
fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> Result<&'s str, ParserError> {
    node.utf8_text(source).map_err(|_| unsupported(node))
}

/// Static JSON value of an object, array, string, template, number or literal node.
fn node_to_value(node: Node<'_>, source: &[u8]) -> Result<Value, ParserError> {
    let node = unwrap_expression(node);
    match node.kind() {
        "object" => {
            let mut map = Map::new();
            for child in named_children(node) {
                if child.kind() != "pair" {
                    return Err(unsupported(child));
                }
                let (Some(key), Some(value)) =
                    (child.child_by_field_name("key"), child.child_by_field_name("value"))
                else {
                    return Err(unsupported(child));
                };
                map.insert(property_key(key, source)?, node_to_value(value, source)?);
            }
            Ok(Value::Object(map))
        }
        "array" => named_children(node)
            .into_iter()
            .map(|child| node_to_value(child, source))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "string" => Ok(Value::String(decode_string_literal(node_text(node, source)?))),
        "template_string" => {
            if named_children(node).iter().any(|c| c.kind() == "template_substitution") {
                return Err(unsupported(node));
            }
            Ok(Value::String(decode_string_literal(node_text(node, source)?)))
        }
        "number" => {
            let text = node_text(node, source)?;
            Ok(serde_json::from_str::<Number>(text)
                .map_or_else(|_| Value::String(text.to_string()), Value::Number))
        }
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "null" | "undefined" => Ok(Value::Null),
        _ => Err(unsupported(node)),
    }
}

/// Object key as written, unquoted.
fn property_key(node: Node<'_>, source: &[u8]) -> Result<String, ParserError> {
    match node.kind() {
        "property_identifier" | "number" => Ok(node_text(node, source)?.to_string()),
        "string" => Ok(decode_string_literal(node_text(node, source)?)),
        _ => Err(unsupported(node)),
    }
}

/// Decodes a quoted JS string literal (`'...'`, `"..."` or `` `...` ``).
#[must_use]
pub fn decode_string_literal(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next();
    chars.next_back();
    unescape_js(chars.as_str())
}

/// Resolves JS escape sequences.
fn unescape_js(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {}
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex);
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex);
            }
            other => out.push(other),
        }
    }
    out
}

/// Pushes the char for `hex`, or `hex` itself when it is not a code point.
fn push_code_point(out: &mut String, hex: &str) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(ch) => out.push(ch),
        None => out.push_str(hex),
    }
}

/// Usable as a bare object key.
fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Single-quoted JS string literal.
#[must_use]
pub fn quote_single(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Writes `value` as a JS literal, indenting nested lines by `depth`.
fn write_js_value(out: &mut String, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth + 1);
    let closing = "  ".repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            out.push_str("{\n");
            for (index, (key, child)) in map.iter().enumerate() {
                out.push_str(&indent);
                if is_identifier(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&quote_single(key));
                }
                out.push_str(": ");
                write_js_value(out, child, depth + 1);
                if index + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&closing);
            out.push('}');
        }
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str("[\n");
            for (index, child) in items.iter().enumerate() {
                out.push_str(&indent);
                write_js_value(out, child, depth + 1);
                if index + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&closing);
            out.push(']');
        }
        Value::String(s) => out.push_str(&quote_single(s)),
        other => out.push_str(&other.to_string()),
    }
}
