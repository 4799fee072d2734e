//! Splits a `.vue` file into its top-level blocks.
//!
//! Only content ranges are recorded, so a rewrite replaces block content and
//! leaves tags, styles and custom blocks byte-identical.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// `lang="ts"` on an opening tag.
#[allow(clippy::unwrap_used)] // constant pattern
static LANG_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\slang\s*=\s*["']?([\w-]+)"#).unwrap());
/// Bare or valued `setup` attribute.
#[allow(clippy::unwrap_used)] // constant pattern
static SETUP_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\ssetup(?:[\s=/>]|$)").unwrap());

/// One top-level block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Opening tag through closing tag.
    pub range: Range<usize>,
    pub content_range: Range<usize>,
    pub lang: Option<String>,
    /// `<script setup>`.
    pub setup: bool,
}

impl Block {
    #[must_use]
    pub fn content<'c>(&self, code: &'c str) -> &'c str {
        code.get(self.content_range.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub template: Option<Block>,
    /// Every `<script>` block in file order.
    pub scripts: Vec<Block>,
}

/// Locates the first top-level `<template>` and every top-level `<script>`.
#[must_use]
pub fn split(code: &str) -> Sections {
    let mut sections = Sections::default();
    let mut pos = 0;

    while let Some(offset) = code.get(pos..).and_then(|rest| rest.find('<')) {
        let at = pos + offset;
        let rest = code.get(at..).unwrap_or_default();

        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(code.len(), |end| at + end + 3);
            continue;
        }

        let Some(name) = tag_name(rest) else {
            pos = at + 1;
            continue;
        };
        let Some((open_end, self_closing)) = open_tag_end(code, at) else {
            break;
        };
        if self_closing {
            pos = open_end;
            continue;
        }

        let close_start = if name == "template" {
            find_template_close(code, open_end)
        } else {
            find_raw_close(code, open_end, name)
        };
        let Some(close_start) = close_start else {
            tracing::debug!(tag = %name, "Unclosed block, stopped splitting");
            break;
        };
        let close_end =
            code.get(close_start..).and_then(|r| r.find('>')).map_or(code.len(), |e| close_start + e + 1);

        let open_tag = code.get(at..open_end).unwrap_or_default();
        let block = Block {
            range: at..close_end,
            content_range: open_end..close_start,
            lang: LANG_ATTR_REGEX
                .captures(open_tag)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
            setup: SETUP_ATTR_REGEX.is_match(open_tag),
        };
        match name {
            "template" if sections.template.is_none() => sections.template = Some(block),
            "script" => sections.scripts.push(block),
            _ => {}
        }
        pos = close_end;
    }

    sections
}

/// Name of the opening tag `rest` starts with.
pub(crate) fn tag_name(rest: &str) -> Option<&str> {
    let body = rest.strip_prefix('<')?;
    let end = body.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-')).unwrap_or(body.len());
    let name = body.get(..end)?;
    let starts_alpha = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha.then_some(name)
}

/// End of the opening tag at `at`, and whether it is self-closing.
pub(crate) fn open_tag_end(code: &str, at: usize) -> Option<(usize, bool)> {
    let mut quote: Option<char> = None;
    let mut previous = '\0';
    for (offset, ch) in code.get(at..)?.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => return Some((at + offset + 1, previous == '/')),
            None => {}
        }
        previous = ch;
    }
    None
}

/// `rest` opens or closes the tag `prefix` names, not a longer one.
fn starts_tag(rest: &str, prefix: &str) -> bool {
    rest.strip_prefix(prefix)
        .and_then(|after| after.chars().next())
        .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
}

/// Closing `</template>` matching the one opened before `from`, skipping nested ones.
fn find_template_close(code: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut pos = from;
    while let Some(offset) = code.get(pos..)?.find('<') {
        let at = pos + offset;
        let rest = code.get(at..)?;
        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(code.len(), |end| at + end + 3);
        } else if starts_tag(rest, "</template") {
            depth -= 1;
            if depth == 0 {
                return Some(at);
            }
            pos = at + 1;
        } else if starts_tag(rest, "<template") {
            let (end, self_closing) = open_tag_end(code, at)?;
            if !self_closing {
                depth += 1;
            }
            pos = end;
        } else {
            pos = at + 1;
        }
    }
    None
}

/// Closing tag of a raw-text element; its content is not markup.
pub(crate) fn find_raw_close(code: &str, from: usize, name: &str) -> Option<usize> {
    let closing = format!("</{name}");
    let mut pos = from;
    while let Some(offset) = code.get(pos..)?.find(&closing) {
        let at = pos + offset;
        if starts_tag(code.get(at..)?, &closing) {
            return Some(at);
        }
        pos = at + closing.len();
    }
    None
}
