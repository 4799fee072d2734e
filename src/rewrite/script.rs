//! String and template literals in JavaScript / TypeScript code.

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{
    Language,
    Node,
    Parser,
    Query,
    QueryCursor,
    StreamingIteratorMut,
};

use super::{
    Edit,
    RewriteContext,
    RewriteError,
    apply_edits,
};
use crate::catalog::parser::decode_string_literal;
use crate::config::TranslateFunctions;

/// Every string and template literal.
const LITERAL_QUERY: &str = "[(string) @literal (template_string) @literal]";

/// `name` or `a.b.c`.
#[allow(clippy::unwrap_used)] // constant pattern
static MEMBER_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

/// Grammar used for a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptLanguage {
    JavaScript,
    TypeScript,
    Tsx,
}

impl ScriptLanguage {
    /// From a `<script lang="...">` attribute.
    #[must_use]
    pub fn from_lang_attr(lang: Option<&str>) -> Self {
        match lang {
            Some("ts") => Self::TypeScript,
            Some("tsx") => Self::Tsx,
            _ => Self::JavaScript,
        }
    }

    #[must_use]
    pub fn tree_sitter_language(self) -> Language {
        match self {
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Replaces every translatable literal in `code` with a call to `function`.
pub fn rewrite_script(
    code: &str,
    language: ScriptLanguage,
    function: &str,
    functions: &TranslateFunctions,
    ctx: &mut RewriteContext<'_>,
) -> Result<String, RewriteError> {
    let edits = literal_edits(code, language, function, functions, ctx)?;
    Ok(apply_edits(code, edits))
}

/// Same as [`rewrite_script`] for a single expression, such as a bound
/// template attribute. Expressions that do not parse are returned unchanged.
pub fn rewrite_expression(
    expression: &str,
    function: &str,
    functions: &TranslateFunctions,
    ctx: &mut RewriteContext<'_>,
) -> Result<String, RewriteError> {
    let wrapped = format!("({expression})");
    if parse(&wrapped, ScriptLanguage::JavaScript)?.root_node().has_error() {
        ctx.skip("Expression does not parse, left untouched", expression);
        return Ok(expression.to_string());
    }

    let rewritten = rewrite_script(&wrapped, ScriptLanguage::JavaScript, function, functions, ctx)?;
    Ok(rewritten
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(expression)
        .to_string())
}

/// Syntax tree of `code`.
fn parse(code: &str, language: ScriptLanguage) -> Result<tree_sitter::Tree, RewriteError> {
    let mut parser = Parser::new();
    parser.set_language(&language.tree_sitter_language())?;
    parser.parse(code, None).ok_or(RewriteError::ParseFailed)
}

/// Edits replacing each translatable literal outside protected positions.
fn literal_edits(
    code: &str,
    language: ScriptLanguage,
    function: &str,
    functions: &TranslateFunctions,
    ctx: &mut RewriteContext<'_>,
) -> Result<Vec<Edit>, RewriteError> {
    let tree = parse(code, language)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::warn!("Script has syntax errors, some literals may be missed");
    }

    let source = code.as_bytes();
    let query = Query::new(&language.tree_sitter_language(), LITERAL_QUERY)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source);

    let mut literals: Vec<Node<'_>> = Vec::new();
    while let Some(match_) = matches.next_mut() {
        literals.extend(match_.captures.iter().map(|capture| capture.node));
    }
    literals.sort_by_key(Node::start_byte);
    literals.dedup();

    let mut edits = Vec::new();
    let mut covered = 0;
    for node in literals {
        if node.start_byte() < covered {
            continue;
        }
        let literal = read_literal(node, code);
        if !ctx.needs_translation(&literal.fragments) {
            continue;
        }
        if let Some(reason) = skip_reason(node, code, functions) {
            ctx.skip(reason, &literal.fragments);
            covered = node.end_byte();
            continue;
        }
        let Some(text) = literal.text else {
            ctx.skip("Template literal with complex substitutions left untouched", &literal.fragments);
            continue;
        };

        if let Some(call) = ctx.translate_call(function, &text)? {
            let in_jsx_attribute = node.parent().is_some_and(|p| p.kind() == "jsx_attribute");
            let text = if in_jsx_attribute { format!("{{{call}}}") } else { call };
            edits.push(Edit { range: node.byte_range(), text });
            covered = node.end_byte();
        }
    }
    Ok(edits)
}

/// Decoded contents of one literal.
struct Literal {
    /// Literal characters only, substitutions excluded.
    fragments: String,
    /// Full text with `{expr}` placeholders; `None` when a substitution is
    /// not a plain identifier or member path.
    text: Option<String>,
}

/// Source text covered by `node`.
fn node_text<'s>(node: Node<'_>, code: &'s str) -> &'s str {
    code.get(node.byte_range()).unwrap_or_default()
}

/// Decodes a `string` or `template_string` node.
fn read_literal(node: Node<'_>, code: &str) -> Literal {
    if node.kind() == "string" {
        let text = decode_string_literal(node_text(node, code));
        return Literal { fragments: text.clone(), text: Some(text) };
    }

    let mut fragments = String::new();
    let mut text = Some(String::new());
    let mut push_raw = |raw: &str, text: &mut Option<String>| {
        let decoded = decode_string_literal(&format!("`{raw}`"));
        fragments.push_str(&decoded);
        if let Some(text) = text.as_mut() {
            text.push_str(&decoded);
        }
    };

    let mut pos = node.start_byte() + 1;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "template_substitution" {
            continue;
        }
        push_raw(code.get(pos..child.start_byte()).unwrap_or_default(), &mut text);
        pos = child.end_byte();

        let expression =
            node_text(child, code).trim_start_matches("${").trim_end_matches('}').trim();
        if is_member_path(expression) {
            if let Some(text) = text.as_mut() {
                text.push('{');
                text.push_str(expression);
                text.push('}');
            }
        } else {
            text = None;
        }
    }
    push_raw(code.get(pos..node.end_byte().saturating_sub(1)).unwrap_or_default(), &mut text);

    Literal { fragments, text }
}

/// `name` or `a.b.c`.
pub(crate) fn is_member_path(expression: &str) -> bool {
    MEMBER_PATH_REGEX.is_match(expression)
}

/// Why a literal in this position must stay as is.
fn skip_reason(node: Node<'_>, code: &str, functions: &TranslateFunctions) -> Option<&'static str> {
    let parent = node.parent()?;
    match parent.kind() {
        "import_statement" | "import_require_clause" => return Some("Module specifier"),
        "export_statement" if parent.child_by_field_name("source") == Some(node) => {
            return Some("Module specifier");
        }
        "pair" if parent.child_by_field_name("key") == Some(node) => return Some("Object key"),
        "literal_type" => return Some("Literal type"),
        _ => {}
    }

    let mut current = Some(parent);
    while let Some(ancestor) = current {
        if ancestor.kind() == "call_expression"
            && let Some(callee) = ancestor.child_by_field_name("function")
        {
            let name = node_text(callee, code);
            if is_translate_function(name, functions) {
                return Some("Already inside a translation call");
            }
            if name.starts_with("console.") {
                return Some("Console call");
            }
            if matches!(name, "import" | "require") {
                return Some("Module specifier");
            }
        }
        current = ancestor.parent();
    }
    None
}

/// `name` is a configured translate function, with or without `this.`.
fn is_translate_function(name: &str, functions: &TranslateFunctions) -> bool {
    functions.names().iter().any(|f| name == *f || f.strip_prefix("this.") == Some(name))
}
