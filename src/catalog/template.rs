//! Interpolation placeholder canonicalization.
//!
//! `{{name}}`, `${name}`, `${{name}}` and `{name}` all normalize to `{name}`.
//! Member access (`{{user.name}}`) normalizes to `{value}`.

use std::sync::LazyLock;

use regex::{
    Captures,
    Regex,
};

/// Any of the accepted placeholder syntaxes around an identifier or member path.
#[allow(clippy::unwrap_used)] // constant pattern
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\{?\{([A-Za-z_][A-Za-z0-9_.]*)\}?\}").unwrap());

/// Argument name used for member-access placeholders.
pub const MEMBER_PLACEHOLDER: &str = "value";

/// One placeholder of a canonical template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Name inside the canonical template and key of the call argument object.
    pub name: String,
    /// Expression bound to the placeholder at the call site.
    pub expression: String,
}

impl Placeholder {
    /// `{ name }` shorthand applies when the expression is the name itself.
    #[must_use]
    pub fn is_shorthand(&self) -> bool {
        self.name == self.expression
    }
}

/// A literal with its placeholders normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    pub text: String,
    /// Distinct placeholders in first-seen order.
    pub placeholders: Vec<Placeholder>,
}

impl Interpolation {
    /// Literals with more than one distinct placeholder cannot be expressed
    /// with a single-entry argument object.
    #[must_use]
    pub fn is_multi_placeholder(&self) -> bool {
        self.placeholders.len() > 1
    }
}

/// Canonicalizes every placeholder in `text`.
#[must_use]
pub fn canonicalize(text: &str) -> Interpolation {
    let mut placeholders: Vec<Placeholder> = Vec::new();

    let canonical = PLACEHOLDER_REGEX.replace_all(text, |caps: &Captures<'_>| {
        let expression = caps.get(1).map_or("", |m| m.as_str());
        let name =
            if expression.contains('.') { MEMBER_PLACEHOLDER } else { expression }.to_string();
        if !placeholders.iter().any(|p| p.expression == expression) {
            placeholders.push(Placeholder { name: name.clone(), expression: expression.to_string() });
        }
        format!("{{{name}}}")
    });

    Interpolation { text: canonical.into_owned(), placeholders }
}
