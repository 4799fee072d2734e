//! Text runs, mustaches and attributes of a component template.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::script::{
    is_member_path,
    rewrite_expression,
};
use super::sfc::{
    find_raw_close,
    open_tag_end,
    tag_name,
};
use super::{
    Edit,
    RewriteContext,
    RewriteError,
    apply_edits,
};
use crate::config::TranslateFunctions;

/// Runs of whitespace, collapsed to one space in extracted text.
#[allow(clippy::unwrap_used)] // constant pattern
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose content is not template markup.
const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];
/// Attribute prefixes whose value is an expression.
const BOUND_PREFIXES: [&str; 4] = [":", "v-", "@", "#"];

/// Rewrites translatable text and attribute values of `code`.
pub fn rewrite_template(
    code: &str,
    function: &str,
    functions: &TranslateFunctions,
    ctx: &mut RewriteContext<'_>,
) -> Result<String, RewriteError> {
    let mut scanner = Scanner { code, function, functions, edits: Vec::new() };
    scanner.run(ctx)?;
    Ok(apply_edits(code, scanner.edits))
}

/// Single pass over a template, collecting edits.
struct Scanner<'c> {
    /// Template section content.
    code: &'c str,
    /// Call substituted for extracted text.
    function: &'c str,
    /// All configured calls, left alone where found.
    functions: &'c TranslateFunctions,
    /// Collected replacements.
    edits: Vec<Edit>,
}

impl Scanner<'_> {
    /// Walks tags, comments and text runs.
    fn run(&mut self, ctx: &mut RewriteContext<'_>) -> Result<(), RewriteError> {
        let code = self.code;
        let mut pos = 0;

        while let Some(rest) = code.get(pos..).filter(|r| !r.is_empty()) {
            if rest.starts_with("<!--") {
                pos = rest.find("-->").map_or(code.len(), |end| pos + end + 3);
            } else if rest.starts_with("</") {
                pos = rest.find('>').map_or(code.len(), |end| pos + end + 1);
            } else if let Some(name) = tag_name(rest) {
                let Some((open_end, self_closing)) = open_tag_end(code, pos) else {
                    break;
                };
                let attrs_end = if self_closing { open_end - 2 } else { open_end - 1 };
                self.rewrite_attributes(pos + 1 + name.len()..attrs_end, ctx)?;

                let raw_text = RAW_TEXT_TAGS.contains(&name.to_ascii_lowercase().as_str());
                pos = if raw_text && !self_closing {
                    find_raw_close(code, open_end, name).unwrap_or(code.len())
                } else {
                    open_end
                };
            } else {
                let end = text_run_end(code, pos);
                self.rewrite_text_run(pos..end, ctx)?;
                pos = end;
            }
        }
        Ok(())
    }

    /// Replaces a whole text run, or the literals inside its mustaches.
    fn rewrite_text_run(
        &mut self,
        range: Range<usize>,
        ctx: &mut RewriteContext<'_>,
    ) -> Result<(), RewriteError> {
        let run = self.code.get(range.clone()).unwrap_or_default();
        let mustaches = find_mustaches(run);

        let mut outside = String::new();
        let mut last = 0;
        for mustache in &mustaches {
            outside.push_str(run.get(last..mustache.outer.start).unwrap_or_default());
            last = mustache.outer.end;
        }
        outside.push_str(run.get(last..).unwrap_or_default());

        if ctx.needs_translation(&outside) {
            if mustaches.iter().all(|m| is_member_path(m.expression(run))) {
                if let Some(call) = ctx.translate_call(self.function, &text_literal(run, &mustaches))? {
                    let leading = run.len() - run.trim_start().len();
                    let trailing = run.len() - run.trim_end().len();
                    let text = format!(
                        "{}{{{{ {call} }}}}{}",
                        run.get(..leading).unwrap_or_default(),
                        run.get(run.len() - trailing..).unwrap_or_default()
                    );
                    self.edits.push(Edit { range, text });
                }
                return Ok(());
            }
            ctx.skip("Text with complex interpolation left untouched", run.trim());
        }

        for mustache in &mustaches {
            let expression = mustache.expression(run);
            if !ctx.needs_translation(expression) {
                continue;
            }
            let rewritten = rewrite_expression(expression, self.function, self.functions, ctx)?;
            if rewritten != expression {
                let bounds = mustache.expression_range(run);
                let start = range.start + bounds.start;
                let end = range.start + bounds.end;
                self.edits.push(Edit { range: start..end, text: rewritten });
            }
        }
        Ok(())
    }

    /// Static attributes become bound calls; bound ones are rewritten as expressions.
    fn rewrite_attributes(
        &mut self,
        range: Range<usize>,
        ctx: &mut RewriteContext<'_>,
    ) -> Result<(), RewriteError> {
        for attribute in parse_attributes(self.code, range) {
            let Some(value) = &attribute.value else {
                continue;
            };
            let text = self.code.get(value.range.clone()).unwrap_or_default();
            if !ctx.needs_translation(text) {
                continue;
            }

            if BOUND_PREFIXES.iter().any(|p| attribute.name.starts_with(p)) {
                if value.quote != Some('"') {
                    ctx.skip("Bound attribute without double quotes left untouched", text);
                    continue;
                }
                let rewritten = rewrite_expression(text, self.function, self.functions, ctx)?;
                if rewritten != text {
                    self.edits.push(Edit { range: value.range.clone(), text: rewritten });
                }
            } else if let Some(call) = ctx.translate_call(self.function, text)? {
                self.edits.push(Edit {
                    range: attribute.range.clone(),
                    text: format!(":{}=\"{call}\"", attribute.name),
                });
            }
        }
        Ok(())
    }
}

/// End of the text run starting at `from`; mustaches may contain `<`.
fn text_run_end(code: &str, from: usize) -> usize {
    let mut pos = from;
    while let Some(rest) = code.get(pos..).filter(|r| !r.is_empty()) {
        if rest.starts_with("{{") {
            pos = rest.find("}}").map_or(code.len(), |end| pos + end + 2);
            continue;
        }
        if pos > from
            && rest.starts_with('<')
            && (rest.starts_with("<!--") || rest.starts_with("</") || tag_name(rest).is_some())
        {
            return pos;
        }
        pos += rest.chars().next().map_or(1, char::len_utf8);
    }
    code.len()
}

/// One `{{ ... }}` interpolation.
struct Mustache {
    /// `{{ ... }}` within the run.
    outer: Range<usize>,
    /// Between the braces.
    inner: Range<usize>,
}

impl Mustache {
    /// Trimmed expression bounds within the run.
    fn expression_range(&self, run: &str) -> Range<usize> {
        let inner = run.get(self.inner.clone()).unwrap_or_default();
        let start = self.inner.start + (inner.len() - inner.trim_start().len());
        let end = self.inner.end - (inner.len() - inner.trim_end().len());
        start..end.max(start)
    }

    /// Trimmed expression text.
    fn expression<'r>(&self, run: &'r str) -> &'r str {
        run.get(self.expression_range(run)).unwrap_or_default()
    }
}

/// Interpolations in `run`, in order.
fn find_mustaches(run: &str) -> Vec<Mustache> {
    let mut mustaches = Vec::new();
    let mut pos = 0;
    while let Some(start) = run.get(pos..).and_then(|r| r.find("{{")).map(|o| pos + o) {
        let Some(end) = run.get(start + 2..).and_then(|r| r.find("}}")).map(|o| start + 2 + o) else {
            break;
        };
        mustaches.push(Mustache { outer: start..end + 2, inner: start + 2..end });
        pos = end + 2;
    }
    mustaches
}

/// Run text with `{{ expr }}` tightened to `{{expr}}` and whitespace collapsed.
fn text_literal(run: &str, mustaches: &[Mustache]) -> String {
    let mut literal = String::new();
    let mut last = 0;
    for mustache in mustaches {
        literal.push_str(run.get(last..mustache.outer.start).unwrap_or_default());
        literal.push_str("{{");
        literal.push_str(mustache.expression(run));
        literal.push_str("}}");
        last = mustache.outer.end;
    }
    literal.push_str(run.get(last..).unwrap_or_default());
    WHITESPACE_REGEX.replace_all(literal.trim(), " ").into_owned()
}

/// Value part of an attribute.
struct AttributeValue {
    /// Inside the quotes.
    range: Range<usize>,
    /// Quote character, `None` when unquoted.
    quote: Option<char>,
}

/// One attribute of an opening tag.
struct Attribute {
    /// Name through closing quote.
    range: Range<usize>,
    /// As written, including any `:` / `v-` prefix.
    name: String,
    /// `None` for boolean attributes.
    value: Option<AttributeValue>,
}

/// Attributes between a tag name and the end of its opening tag.
fn parse_attributes(code: &str, range: Range<usize>) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    let Some(body) = code.get(range.clone()) else {
        return attributes;
    };
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let at = |i: usize| chars.get(i).map(|(offset, ch)| (range.start + offset, *ch));
    let end_of_body = range.end;
    let mut i = 0;

    loop {
        while at(i).is_some_and(|(_, c)| c.is_whitespace() || c == '/') {
            i += 1;
        }
        let Some((name_start, _)) = at(i) else {
            break;
        };
        while at(i).is_some_and(|(_, c)| !(c.is_whitespace() || c == '=' || c == '/')) {
            i += 1;
        }
        let name_end = at(i).map_or(end_of_body, |(offset, _)| offset);
        let name = code.get(name_start..name_end).unwrap_or_default().to_string();

        let mut j = i;
        while at(j).is_some_and(|(_, c)| c.is_whitespace()) {
            j += 1;
        }
        if !at(j).is_some_and(|(_, c)| c == '=') {
            attributes.push(Attribute { range: name_start..name_end, name, value: None });
            continue;
        }
        j += 1;
        while at(j).is_some_and(|(_, c)| c.is_whitespace()) {
            j += 1;
        }

        let (value, attr_end) = match at(j) {
            Some((quote_at, quote)) if quote == '"' || quote == '\'' => {
                let mut k = j + 1;
                while at(k).is_some_and(|(_, c)| c != quote) {
                    k += 1;
                }
                let close = at(k).map_or(end_of_body, |(offset, _)| offset);
                i = k + 1;
                (
                    AttributeValue { range: quote_at + 1..close, quote: Some(quote) },
                    at(k).map_or(end_of_body, |(offset, c)| offset + c.len_utf8()),
                )
            }
            Some((value_start, _)) => {
                let mut k = j;
                while at(k).is_some_and(|(_, c)| !c.is_whitespace()) {
                    k += 1;
                }
                let value_end = at(k).map_or(end_of_body, |(offset, _)| offset);
                i = k;
                (AttributeValue { range: value_start..value_end, quote: None }, value_end)
            }
            None => {
                i = j;
                (AttributeValue { range: end_of_body..end_of_body, quote: None }, end_of_body)
            }
        };
        attributes.push(Attribute { range: name_start..attr_end, name, value: Some(value) });
    }
    attributes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;
    use crate::rewrite::tests::FakeResolver;

    fn rewrite(code: &str, resolver: &mut FakeResolver) -> (String, usize) {
        let functions = TranslateFunctions::default();
        let mut ctx = RewriteContext::new(resolver, None);
        let out = rewrite_template(code, &functions.template, &functions, &mut ctx).unwrap();
        (out, ctx.skipped)
    }

    #[rstest]
    fn test_text_runs_become_mustaches() {
        let mut resolver = FakeResolver::with(&[("你好", "common.hello")]);

        let (out, _) = rewrite("<div>\n  <p> 你好 </p>\n  <span>ok</span>\n</div>", &mut resolver);

        assert_eq!(out, "<div>\n  <p> {{ $t('common.hello') }} </p>\n  <span>ok</span>\n</div>");
    }

    #[rstest]
    #[case::identifier("<p>你好 {{ name }}</p>", "<p>{{ $t('k1', { name }) }}</p>", "你好 {name}")]
    #[case::member("<p>欢迎 {{user.name}}，再见</p>", "<p>{{ $t('k1', { value: user.name }) }}</p>", "欢迎 {value}，再见")]
    #[case::collapsed("<p>保存\n      成功</p>", "<p>{{ $t('k1') }}</p>", "保存 成功")]
    fn test_text_with_interpolation(#[case] code: &str, #[case] expected: &str, #[case] canonical: &str) {
        let mut resolver = FakeResolver::default();

        let (out, _) = rewrite(code, &mut resolver);

        assert_eq!(out, expected);
        assert_that!(resolver.seen, elements_are![eq(canonical)]);
    }

    #[rstest]
    fn test_static_and_bound_attributes() {
        let mut resolver = FakeResolver::default();

        let (out, _) = rewrite(
            r#"<input placeholder="请输入" :title="ok ? '是' : '否'" class="x" disabled />"#,
            &mut resolver,
        );

        assert_eq!(
            out,
            r#"<input :placeholder="$t('k1')" :title="ok ? $t('k2') : $t('k3')" class="x" disabled />"#
        );
    }

    #[rstest]
    fn test_comments_and_raw_text_are_left_alone() {
        let code = "<!-- 注释 -->\n<script>var a = '脚本'</script>\n<style>.a{content:'样式'}</style>";
        let mut resolver = FakeResolver::default();

        let (out, _) = rewrite(code, &mut resolver);

        assert_eq!(out, code);
        assert_that!(resolver.seen, is_empty());
    }

    #[rstest]
    fn test_mustache_with_comparison_stays_in_run() {
        let mut resolver = FakeResolver::default();

        let (out, _) = rewrite("<p>{{ a < b ? '小' : '大' }}</p>", &mut resolver);

        assert_eq!(out, "<p>{{ a < b ? $t('k1') : $t('k2') }}</p>");
    }

    #[rstest]
    fn test_complex_interpolation_is_skipped() {
        let mut resolver = FakeResolver::default();

        let (out, skipped) = rewrite("<p>共 {{ list.length + 1 }} 条</p>", &mut resolver);

        assert_eq!(out, "<p>共 {{ list.length + 1 }} 条</p>");
        assert_that!(skipped, eq(1));
    }

    #[rstest]
    fn test_multi_placeholder_text_is_skipped() {
        let mut resolver = FakeResolver::default();

        let (out, skipped) = rewrite("<p>{{ a }} 和 {{ b }}</p>", &mut resolver);

        assert_eq!(out, "<p>{{ a }} 和 {{ b }}</p>");
        assert_that!(skipped, eq(1));
    }

    #[rstest]
    fn test_attributes_are_parsed() {
        let code = r#"<a href='x' v-if=ok download title = "标 题">"#;

        let attributes = parse_attributes(code, 2..code.len() - 1);

        let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["href", "v-if", "download", "title"]);
        let title = attributes[3].value.as_ref().unwrap();
        assert_eq!(&code[title.range.clone()], "标 题");
        assert_eq!(&code[attributes[3].range.clone()], r#"title = "标 题""#);
        assert_that!(attributes[2].value.is_none(), eq(true));
        assert_that!(attributes[1].value.as_ref().unwrap().quote, none());
    }
}
