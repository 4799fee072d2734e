//! Rewrites hard-coded text in component and script sources into translation calls.

pub mod script;
pub mod sfc;
pub mod template;

use std::fmt;
use std::ops::Range;
use std::path::{
    Path,
    PathBuf,
};

use regex::Regex;
use thiserror::Error;

pub use self::script::ScriptLanguage;
use crate::catalog::parser::quote_single;
use crate::catalog::template::{
    MEMBER_PLACEHOLDER,
    Placeholder,
    canonicalize,
};
use crate::catalog::{
    CatalogError,
    LanguageMap,
};
use crate::config::I18nSettings;
use crate::fsutil;

#[derive(Error, Debug)]
pub enum RewriteError {
    /// Error when failing to set the language for the parser
    #[error("Failed to set language for parser: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),

    #[error("Invalid literal query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("Failed to parse source code")]
    ParseFailed,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid translatablePattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Unsupported source file: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maps a literal to the key it is translated through.
pub trait KeyResolver: fmt::Debug {
    fn resolve(&mut self, namespace_hint: Option<&str>, text: &str) -> Result<String, CatalogError>;
}

impl KeyResolver for LanguageMap<'_> {
    fn resolve(&mut self, namespace_hint: Option<&str>, text: &str) -> Result<String, CatalogError> {
        self.find_or_create_key(namespace_hint, text)
    }
}

/// Whether `text` holds characters outside Latin-1.
#[must_use]
pub fn needs_translation(text: &str) -> bool {
    text.chars().any(|c| u32::from(c) > 0xFF)
}

/// Decides which literals hold translatable text.
#[derive(Debug, Clone, Default)]
pub enum TextFilter {
    /// Any character outside Latin-1, see [`needs_translation`].
    #[default]
    NonLatin1,
    /// Text matching `translatablePattern`.
    Pattern(Regex),
}

impl TextFilter {
    pub fn from_settings(settings: &I18nSettings) -> Result<Self, regex::Error> {
        settings
            .translatable_pattern
            .as_deref()
            .map_or(Ok(Self::NonLatin1), |pattern| Regex::new(pattern).map(Self::Pattern))
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::NonLatin1 => needs_translation(text),
            Self::Pattern(regex) => regex.is_match(text),
        }
    }
}

/// Byte range replacement in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

/// Applies non-overlapping edits; overlapping ones after the first are dropped.
#[must_use]
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| edit.range.start);
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            tracing::debug!(range = ?edit.range, "Overlapping edit dropped");
            continue;
        }
        let (Some(before), Some(_)) = (source.get(cursor..edit.range.start), source.get(edit.range.clone()))
        else {
            continue;
        };
        out.push_str(before);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(source.get(cursor..).unwrap_or_default());
    out
}

/// Per-file rewrite state: key resolution plus counters.
#[derive(Debug)]
pub struct RewriteContext<'r> {
    /// Maps literals to keys.
    resolver: &'r mut dyn KeyResolver,
    /// Namespace for keys minted from this file.
    namespace_hint: Option<&'r str>,
    /// Which literals are translated at all.
    filter: TextFilter,
    pub replaced: usize,
    pub skipped: usize,
}

impl<'r> RewriteContext<'r> {
    pub fn new(resolver: &'r mut dyn KeyResolver, namespace_hint: Option<&'r str>) -> Self {
        Self { resolver, namespace_hint, filter: TextFilter::default(), replaced: 0, skipped: 0 }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: TextFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Whether `text` is translatable under the configured filter.
    #[must_use]
    pub fn needs_translation(&self, text: &str) -> bool {
        self.filter.matches(text)
    }

    /// Translation call replacing `literal`, or `None` when the literal is skipped.
    pub fn translate_call(
        &mut self,
        function: &str,
        literal: &str,
    ) -> Result<Option<String>, CatalogError> {
        let interpolation = canonicalize(literal);
        if interpolation.is_multi_placeholder() {
            tracing::warn!(
                text = %literal,
                placeholders = interpolation.placeholders.len(),
                "Literal with several placeholders left untouched"
            );
            self.skipped += 1;
            return Ok(None);
        }

        let key = self.resolver.resolve(self.namespace_hint, literal)?;
        self.replaced += 1;
        Ok(Some(format_call(function, &key, interpolation.placeholders.first())))
    }

    pub fn skip(&mut self, reason: &str, text: &str) {
        tracing::debug!(text = %text, "{reason}");
        self.skipped += 1;
    }
}

/// `fn('key')`, `fn('key', { name })` or `fn('key', { value: a.b })`.
#[must_use]
pub fn format_call(function: &str, key: &str, placeholder: Option<&Placeholder>) -> String {
    let key = quote_single(key);
    match placeholder {
        None => format!("{function}({key})"),
        Some(p) if p.is_shorthand() => format!("{function}({key}, {{ {} }})", p.name),
        Some(p) => format!("{function}({key}, {{ {MEMBER_PLACEHOLDER}: {} }})", p.expression),
    }
}

/// What a source file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// `.vue`: template plus script blocks.
    Component,
    Script(ScriptLanguage),
}

impl SourceKind {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("vue") => Some(Self::Component),
            Some("js" | "mjs" | "cjs" | "jsx") => Some(Self::Script(ScriptLanguage::JavaScript)),
            Some("ts" | "mts" | "cts") => Some(Self::Script(ScriptLanguage::TypeScript)),
            Some("tsx") => Some(Self::Script(ScriptLanguage::Tsx)),
            _ => None,
        }
    }
}

/// Outcome of rewriting one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub path: PathBuf,
    pub replaced: usize,
    pub skipped: usize,
    pub changed: bool,
}

/// Rewritten text with its counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub code: String,
    pub replaced: usize,
    pub skipped: usize,
}

/// Drives extraction, key resolution and substitution for whole files.
#[derive(Debug)]
pub struct SourceRewriter<'a> {
    /// Project settings.
    settings: &'a I18nSettings,
    /// Shared by every file of the run.
    resolver: &'a mut dyn KeyResolver,
    /// Compiled from `translatablePattern`.
    filter: TextFilter,
}

impl<'a> SourceRewriter<'a> {
    pub fn new(
        settings: &'a I18nSettings,
        resolver: &'a mut dyn KeyResolver,
    ) -> Result<Self, RewriteError> {
        Ok(Self { settings, resolver, filter: TextFilter::from_settings(settings)? })
    }

    /// Rewrites the file at `path`, writing it back when `replace` is set.
    pub async fn translate(
        &mut self,
        path: &Path,
        namespace_hint: Option<&str>,
        replace: bool,
    ) -> Result<RewriteReport, RewriteError> {
        let kind =
            SourceKind::from_path(path).ok_or_else(|| RewriteError::Unsupported(path.to_path_buf()))?;
        let code = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RewriteError::Io { path: path.to_path_buf(), source })?;

        let rewritten = self.rewrite_source(kind, &code, namespace_hint)?;
        let changed = rewritten.code != code;
        if replace && changed {
            fsutil::write_replace(path, &rewritten.code)
                .await
                .map_err(|source| RewriteError::Io { path: path.to_path_buf(), source })?;
        }

        tracing::debug!(
            path = %path.display(),
            replaced = rewritten.replaced,
            skipped = rewritten.skipped,
            changed,
            "Source rewritten"
        );
        Ok(RewriteReport {
            path: path.to_path_buf(),
            replaced: rewritten.replaced,
            skipped: rewritten.skipped,
            changed,
        })
    }

    /// Rewrites in memory.
    pub fn rewrite_source(
        &mut self,
        kind: SourceKind,
        code: &str,
        namespace_hint: Option<&str>,
    ) -> Result<Rewritten, RewriteError> {
        let settings = self.settings;
        let functions = &settings.translate_functions;
        let mut ctx =
            RewriteContext::new(&mut *self.resolver, namespace_hint).with_filter(self.filter.clone());

        let code = match kind {
            SourceKind::Script(language) => {
                if is_ignored(code, settings) {
                    code.to_string()
                } else {
                    script::rewrite_script(code, language, &functions.script, functions, &mut ctx)?
                }
            }
            SourceKind::Component => {
                let sections = sfc::split(code);
                let mut edits = Vec::new();

                if let Some(template) = &sections.template
                    && !is_ignored(template.content(code), settings)
                {
                    let rewritten = template::rewrite_template(
                        template.content(code),
                        &functions.template,
                        functions,
                        &mut ctx,
                    )?;
                    edits.push(Edit { range: template.content_range.clone(), text: rewritten });
                }

                for block in &sections.scripts {
                    let content = block.content(code);
                    if is_ignored(content, settings) {
                        continue;
                    }
                    let language = ScriptLanguage::from_lang_attr(block.lang.as_deref());
                    let function =
                        if block.setup { &functions.setup_script } else { &functions.component_script };
                    let rewritten =
                        script::rewrite_script(content, language, function, functions, &mut ctx)?;
                    edits.push(Edit { range: block.content_range.clone(), text: rewritten });
                }

                apply_edits(code, edits)
            }
        };

        Ok(Rewritten { code, replaced: ctx.replaced, skipped: ctx.skipped })
    }
}

/// Whether `section` carries the ignore marker.
fn is_ignored(section: &str, settings: &I18nSettings) -> bool {
    let ignored = section.contains(settings.ignore_marker.as_str());
    if ignored {
        tracing::debug!(marker = %settings.ignore_marker, "Section skipped by ignore marker");
    }
    ignored
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use googletest::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;

    /// Resolver with fixed keys; unknown texts get `k<n>`.
    #[derive(Debug, Default)]
    pub(crate) struct FakeResolver {
        pub(crate) keys: HashMap<String, String>,
        pub(crate) seen: Vec<String>,
    }

    impl FakeResolver {
        pub(crate) fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                keys: entries.iter().map(|(t, k)| ((*t).to_string(), (*k).to_string())).collect(),
                seen: Vec::new(),
            }
        }
    }

    impl KeyResolver for FakeResolver {
        fn resolve(&mut self, _hint: Option<&str>, text: &str) -> Result<String, CatalogError> {
            let canonical = canonicalize(text).text;
            self.seen.push(canonical.clone());
            let next = format!("k{}", self.keys.len() + 1);
            Ok(self.keys.entry(canonical).or_insert(next).clone())
        }
    }

    #[rstest]
    #[case::plain(None, "$t('common.ok')")]
    #[case::shorthand(
        Some(Placeholder { name: "name".into(), expression: "name".into() }),
        "$t('common.ok', { name })"
    )]
    #[case::member(
        Some(Placeholder { name: "value".into(), expression: "user.name".into() }),
        "$t('common.ok', { value: user.name })"
    )]
    fn test_call_forms(#[case] placeholder: Option<Placeholder>, #[case] expected: &str) {
        assert_eq!(format_call("$t", "common.ok", placeholder.as_ref()), expected);
    }

    #[rstest]
    fn test_multi_placeholder_literal_is_skipped() {
        let mut resolver = FakeResolver::default();
        let mut ctx = RewriteContext::new(&mut resolver, None);

        let call = ctx.translate_call("$t", "{{a}} 和 {{b}}").unwrap();

        assert_that!(call, none());
        assert_that!(ctx.skipped, eq(1));
        assert_that!(ctx.replaced, eq(0));
    }

    #[rstest]
    #[case("a.vue", Some(SourceKind::Component))]
    #[case("a.mjs", Some(SourceKind::Script(ScriptLanguage::JavaScript)))]
    #[case("a.ts", Some(SourceKind::Script(ScriptLanguage::TypeScript)))]
    #[case("a.tsx", Some(SourceKind::Script(ScriptLanguage::Tsx)))]
    #[case("a.css", None)]
    fn test_source_kinds(#[case] path: &str, #[case] expected: Option<SourceKind>) {
        assert_eq!(SourceKind::from_path(Path::new(path)), expected);
    }

    #[rstest]
    #[case("保存", true)]
    #[case("café", false)]
    #[case("plain", false)]
    fn test_translation_detection(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(needs_translation(text), expected);
    }

    #[rstest]
    fn test_edits_apply_in_order() {
        let edits = vec![
            Edit { range: 6..11, text: "there".to_string() },
            Edit { range: 0..5, text: "Hi".to_string() },
            Edit { range: 7..9, text: "dropped".to_string() },
        ];

        assert_eq!(apply_edits("hello world!", edits), "Hi there!");
    }

    #[rstest]
    fn test_component_sections_rewrite_independently() {
        let settings = I18nSettings::default();
        let mut resolver = FakeResolver::default();
        let mut rewriter = SourceRewriter::new(&settings, &mut resolver).unwrap();
        let code = "<template>\n  <p>你好</p>\n</template>\n\n<script>\n// i18nIgnore\nexport default { data: () => ({ msg: '不翻译' }) }\n</script>\n\n<style>\n.a::after { content: '样式'; }\n</style>\n";

        let result = rewriter.rewrite_source(SourceKind::Component, code, Some("home")).unwrap();

        assert_eq!(
            result.code,
            "<template>\n  <p>{{ $t('k1') }}</p>\n</template>\n\n<script>\n// i18nIgnore\nexport default { data: () => ({ msg: '不翻译' }) }\n</script>\n\n<style>\n.a::after { content: '样式'; }\n</style>\n"
        );
        assert_that!(result.replaced, eq(1));
    }

    #[rstest]
    fn test_ignored_script_file_is_untouched() {
        let settings = I18nSettings::default();
        let mut resolver = FakeResolver::default();
        let mut rewriter = SourceRewriter::new(&settings, &mut resolver).unwrap();
        let code = "/* i18nIgnore */\nconst a = '中文'\n";

        let result = rewriter
            .rewrite_source(SourceKind::Script(ScriptLanguage::JavaScript), code, None)
            .unwrap();

        assert_eq!(result.code, code);
        assert_that!(result.replaced, eq(0));
    }

    #[rstest]
    fn test_setup_script_uses_setup_function() {
        let settings = I18nSettings::default();
        let mut resolver = FakeResolver::default();
        let mut rewriter = SourceRewriter::new(&settings, &mut resolver).unwrap();
        let code = "<script setup>\nconst a = '你好'\n</script>\n\n<script>\nexport default { data: () => ({ b: '再见' }) }\n</script>\n";

        let result = rewriter.rewrite_source(SourceKind::Component, code, Some("home")).unwrap();

        assert_eq!(
            result.code,
            "<script setup>\nconst a = t('k1')\n</script>\n\n<script>\nexport default { data: () => ({ b: this.$t('k2') }) }\n</script>\n"
        );
    }

    #[rstest]
    #[case::default_rule(None, "Hello {{name}}", false)]
    #[case::default_rule_cjk(None, "你好", true)]
    #[case::letters(Some("[A-Za-z]"), "Hello {{name}}", true)]
    #[case::letters_digits_only(Some("[A-Za-z]"), "42", false)]
    fn test_text_filter(#[case] pattern: Option<&str>, #[case] text: &str, #[case] expected: bool) {
        let settings =
            I18nSettings { translatable_pattern: pattern.map(String::from), ..I18nSettings::default() };

        let filter = TextFilter::from_settings(&settings).unwrap();

        assert_eq!(filter.matches(text), expected);
    }

    #[rstest]
    fn test_translatable_pattern_extracts_ascii_literals() {
        let settings = I18nSettings {
            translatable_pattern: Some("[A-Za-z]".to_string()),
            ..I18nSettings::default()
        };
        let mut resolver = FakeResolver::with(&[("Hello {name}", "common.trans_ab12cd")]);
        let mut rewriter = SourceRewriter::new(&settings, &mut resolver).unwrap();

        let result = rewriter
            .rewrite_source(
                SourceKind::Script(ScriptLanguage::JavaScript),
                "const m = \"Hello {{name}}\"\n",
                None,
            )
            .unwrap();

        assert_eq!(result.code, "const m = i18n.t('common.trans_ab12cd', { name })\n");
        assert_that!(result.replaced, eq(1));
    }

    #[rstest]
    fn test_invalid_translatable_pattern_is_an_error() {
        let settings =
            I18nSettings { translatable_pattern: Some("(".to_string()), ..I18nSettings::default() };
        let mut resolver = FakeResolver::default();

        let result = SourceRewriter::new(&settings, &mut resolver);

        assert!(matches!(result, Err(RewriteError::Pattern(_))));
    }
}
