use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use super::matcher::PathMatcher;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "pathMatchers[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Numbered list, one error per line.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Output syntax for locale files written by the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Js,
}

impl OutputFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Js => "js",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct I18nSettings {
    /// Directory globs (relative to the project root) holding locale files.
    /// `.` stands for the project root itself.
    pub locales_paths: Vec<String>,

    /// Patterns classifying files under a locale directory.
    /// Placeholders: `{locale}`, `{namespace}`, `{namespaces}` (may span folders), `{ext}`.
    pub path_matchers: Vec<String>,

    /// Locale assigned to files whose pattern has no `{locale}` group,
    /// and the locale new keys are minted into.
    pub source_language: String,

    /// Prefix keys with the namespace derived from the file path.
    pub namespace: bool,

    /// Walk locale directories without the two-level depth limit.
    pub include_subfolders: bool,

    /// Extra globs skipped while walking locale directories.
    pub ignore_files: Vec<String>,

    pub key_separator: String,

    /// Namespace for minted keys when the caller gives no hint.
    pub default_namespace: Option<String>,

    /// A file section containing this token is never rewritten.
    pub ignore_marker: String,

    pub translate_functions: TranslateFunctions,

    /// Source files considered for rewriting.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    /// Format for locale files that do not exist yet.
    pub output_format: OutputFormat,

    /// Regex a literal must match to be translated.
    /// Unset: text holding any character above U+00FF.
    pub translatable_pattern: Option<String>,
}

/// Call expressions substituted for extracted literals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslateFunctions {
    /// Used inside `<template>` sections.
    pub template: String,
    /// Used inside the `<script>` section of a component file.
    pub component_script: String,
    /// Used inside `<script setup>`, where there is no `this`.
    pub setup_script: String,
    /// Used in plain script files.
    pub script: String,
}

impl TranslateFunctions {
    /// Every configured function name.
    #[must_use]
    pub fn names(&self) -> [&str; 4] {
        [&self.template, &self.component_script, &self.setup_script, &self.script]
    }
}

impl Default for TranslateFunctions {
    fn default() -> Self {
        Self {
            template: "$t".to_string(),
            component_script: "this.$t".to_string(),
            setup_script: "t".to_string(),
            script: "i18n.t".to_string(),
        }
    }
}

impl I18nSettings {
    /// # Errors
    /// - Required field is empty
    /// - Invalid glob or locale path pattern
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.source_language.is_empty() {
            errors.push(ValidationError::new(
                "sourceLanguage",
                "The source language cannot be empty. Example: \"zh\"",
            ));
        }

        if self.ignore_marker.is_empty() {
            errors.push(ValidationError::new(
                "ignoreMarker",
                "The marker cannot be empty. Example: \"i18nIgnore\"",
            ));
        }

        if self.path_matchers.is_empty() {
            errors.push(ValidationError::new(
                "pathMatchers",
                "At least one pattern is required. Example: [\"{locale}/{namespaces}.{ext}\"]",
            ));
        }

        for (index, pattern) in self.path_matchers.iter().enumerate() {
            if let Err(e) = PathMatcher::compile(pattern) {
                errors.push(ValidationError::new(
                    format!("pathMatchers[{index}]"),
                    format!("Invalid locale path pattern '{pattern}': {e}"),
                ));
            }
        }

        let glob_fields = [
            ("localesPaths", &self.locales_paths),
            ("ignoreFiles", &self.ignore_files),
            ("includePatterns", &self.include_patterns),
            ("excludePatterns", &self.exclude_patterns),
        ];
        for (field, patterns) in glob_fields {
            for (index, pattern) in patterns.iter().enumerate() {
                if pattern == "." {
                    continue;
                }
                if let Err(e) = globset::Glob::new(pattern) {
                    errors.push(ValidationError::new(
                        format!("{field}[{index}]"),
                        format!("Invalid glob pattern '{pattern}': {e}"),
                    ));
                }
            }
        }

        let functions = [
            ("translateFunctions.template", &self.translate_functions.template),
            ("translateFunctions.componentScript", &self.translate_functions.component_script),
            ("translateFunctions.setupScript", &self.translate_functions.setup_script),
            ("translateFunctions.script", &self.translate_functions.script),
        ];
        for (field, name) in functions {
            if name.trim().is_empty() {
                errors.push(ValidationError::new(field, "The function name cannot be empty"));
            }
        }

        if let Some(pattern) = &self.translatable_pattern
            && let Err(e) = regex::Regex::new(pattern)
        {
            errors.push(ValidationError::new(
                "translatablePattern",
                format!("Invalid regular expression '{pattern}': {e}"),
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Effective namespace for a minted key.
    #[must_use]
    pub fn namespace_for<'a>(&'a self, hint: Option<&'a str>, locale: &'a str) -> &'a str {
        hint.filter(|h| !h.is_empty())
            .or(self.default_namespace.as_deref())
            .unwrap_or(locale)
    }
}

impl Default for I18nSettings {
    fn default() -> Self {
        Self {
            locales_paths: vec!["locales".to_string(), "src/locales".to_string()],
            path_matchers: vec!["{locale}/{namespaces}.{ext}".to_string(), "{locale}.{ext}".to_string()],
            source_language: "zh".to_string(),
            namespace: true,
            include_subfolders: false,
            ignore_files: Vec::new(),
            key_separator: ".".to_string(),
            default_namespace: None,
            ignore_marker: "i18nIgnore".to_string(),
            translate_functions: TranslateFunctions::default(),
            include_patterns: vec!["**/*.{vue,js,ts}".to_string()],
            exclude_patterns: vec!["node_modules/**".to_string(), "dist/**".to_string()],
            output_format: OutputFormat::default(),
            translatable_pattern: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_validate_valid_settings() {
        let settings = I18nSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn test_deserialize_partial_settings() {
        let json = r#"{"sourceLanguage": "en", "namespace": false, "outputFormat": "js"}"#;

        let settings: I18nSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.source_language, eq("en"));
        assert_that!(settings.namespace, eq(false));
        assert_that!(settings.output_format, eq(OutputFormat::Js));
        assert_that!(settings.key_separator, eq("."));
        assert_that!(settings.ignore_marker, eq("i18nIgnore"));
    }

    #[rstest]
    fn test_deserialize_empty_settings() {
        let settings: I18nSettings = serde_json::from_str("{}").unwrap();

        assert_that!(settings.locales_paths, elements_are![eq("locales"), eq("src/locales")]);
        assert_that!(
            settings.path_matchers,
            elements_are![eq("{locale}/{namespaces}.{ext}"), eq("{locale}.{ext}")]
        );
        assert_that!(settings.translate_functions.template, eq("$t"));
        assert_that!(settings.translate_functions.component_script, eq("this.$t"));
        assert_that!(settings.translate_functions.setup_script, eq("t"));
        assert_that!(settings.translatable_pattern, none());
    }

    #[rstest]
    fn test_deserialize_nested_translate_functions() {
        let json = r#"{"translateFunctions": {"script": "t", "setupScript": "i18n.global.t"}, "translatablePattern": "[A-Za-z]"}"#;

        let settings: I18nSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.translate_functions.script, eq("t"));
        assert_that!(settings.translate_functions.setup_script, eq("i18n.global.t"));
        assert_that!(settings.translatable_pattern.as_deref(), some(eq("[A-Za-z]")));
        assert_that!(settings.translate_functions.template, eq("$t"));
    }

    #[rstest]
    fn test_validate_invalid_key_separator_empty() {
        let settings = I18nSettings { key_separator: String::new(), ..I18nSettings::default() };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("keySeparator")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn test_validate_invalid_path_matcher() {
        let settings = I18nSettings {
            path_matchers: vec!["{locale}/{namespace}/{namespace}.json".to_string()],
            ..I18nSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![field!(ValidationError.field_path, eq("pathMatchers[0]"))])
        );
    }

    #[rstest]
    fn test_validate_invalid_ignore_glob() {
        let settings = I18nSettings {
            ignore_files: vec!["ok/**".to_string(), "bad[glob".to_string()],
            ..I18nSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("ignoreFiles[1]")),
                field!(ValidationError.message, contains_substring("bad[glob"))
            ]])
        );
    }

    #[rstest]
    fn test_validate_invalid_translatable_pattern() {
        let settings = I18nSettings {
            translatable_pattern: Some("[A-Z".to_string()),
            ..I18nSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![all![
                field!(ValidationError.field_path, eq("translatablePattern")),
                field!(ValidationError.message, contains_substring("[A-Z"))
            ]])
        );
    }

    #[rstest]
    fn test_validate_empty_setup_script_function() {
        let settings = I18nSettings {
            translate_functions: TranslateFunctions {
                setup_script: " ".to_string(),
                ..TranslateFunctions::default()
            },
            ..I18nSettings::default()
        };

        assert_that!(
            settings.validate(),
            err(elements_are![field!(ValidationError.field_path, eq("translateFunctions.setupScript"))])
        );
    }

    #[rstest]
    fn test_validate_accepts_project_root_locale_path() {
        let settings =
            I18nSettings { locales_paths: vec![".".to_string()], ..I18nSettings::default() };

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn test_config_error_validation_errors_format() {
        let settings = I18nSettings {
            key_separator: String::new(),
            ignore_marker: String::new(),
            ..I18nSettings::default()
        };

        let errors = settings.validate().unwrap_err();
        let message = format!("{}", ConfigError::ValidationErrors(errors));

        assert_that!(message, contains_substring("Configuration validation failed"));
        assert_that!(message, contains_substring("1. keySeparator"));
        assert_that!(message, contains_substring("2. ignoreMarker"));
    }

    #[rstest]
    #[case::hint(Some("home"), None, "home")]
    #[case::empty_hint_falls_back(Some(""), Some("common"), "common")]
    #[case::default_namespace(None, Some("common"), "common")]
    #[case::locale_fallback(None, None, "zh")]
    fn test_namespace_for_resolution(
        #[case] hint: Option<&str>,
        #[case] default_namespace: Option<&str>,
        #[case] expected: &str,
    ) {
        let settings = I18nSettings {
            default_namespace: default_namespace.map(String::from),
            ..I18nSettings::default()
        };

        assert_eq!(settings.namespace_for(hint, "zh"), expected);
    }
}
