//! Pattern matchers for source files and locale files.

use std::path::{
    Path,
    PathBuf,
};

use globset::{
    Glob,
    GlobBuilder,
    GlobSet,
    GlobSetBuilder,
};
use regex::Regex;

use super::I18nSettings;

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid source include pattern '{pattern}': {source}")]
    InvalidSourceIncludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Unknown placeholder '{{{placeholder}}}' in locale path pattern '{pattern}'")]
    UnknownPlaceholder { pattern: String, placeholder: String },

    #[error("Invalid locale path pattern '{pattern}': {source}")]
    InvalidPathPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to build glob set: {0}")]
    GlobSetBuild(#[from] globset::Error),
}

/// Builds a case-sensitive glob set where `*` never crosses a `/`.
///
/// # Errors
/// Returns the first pattern that fails to compile.
pub fn build_glob_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    builder.build()
}

/// Matches source files against `includePatterns` / `excludePatterns`.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    /// Patterns are matched against paths relative to this.
    workspace_root: PathBuf,
    /// Compiled `includePatterns`.
    source_include_set: GlobSet,
    /// Compiled `excludePatterns`.
    exclude_set: GlobSet,
}

impl FileMatcher {
    /// Creates a new matcher from settings.
    pub fn new(workspace_root: PathBuf, settings: &I18nSettings) -> Result<Self, MatcherError> {
        let source_include_set =
            Self::build_glob_set(&settings.include_patterns, |pattern, source| {
                MatcherError::InvalidSourceIncludePattern { pattern, source }
            })?;

        let exclude_set = Self::build_glob_set(&settings.exclude_patterns, |pattern, source| {
            MatcherError::InvalidExcludePattern { pattern, source }
        })?;

        Ok(Self { workspace_root, source_include_set, exclude_set })
    }

    /// Compiles `patterns`, mapping the first failure through `make_error`.
    fn build_glob_set<F>(patterns: &[String], make_error: F) -> Result<GlobSet, MatcherError>
    where
        F: Fn(String, globset::Error) -> MatcherError,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| make_error(pattern.clone(), e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Returns true if the path matches `includePatterns` but not `excludePatterns`.
    ///
    /// The path must be absolute and under the workspace root.
    #[must_use]
    pub fn is_source_file(&self, absolute_path: &Path) -> bool {
        let Some(relative_path) = absolute_path.strip_prefix(&self.workspace_root).ok() else {
            return false;
        };

        self.is_source_file_relative(relative_path)
    }

    /// The path must be relative to the workspace root.
    #[must_use]
    pub fn is_source_file_relative(&self, relative_path: &Path) -> bool {
        self.source_include_set.is_match(relative_path) && !self.exclude_set.is_match(relative_path)
    }
}

/// Result of classifying a locale file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub locale: Option<String>,
    /// `.`-joined when the captured segment spans folders.
    pub namespace: Option<String>,
    pub ext: Option<String>,
    /// The configured pattern that matched.
    pub matcher: String,
}

/// Compiled locale path patterns, tried in configured order.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    /// Configured pattern and its compiled form.
    patterns: Vec<(String, Regex)>,
}

impl PathMatcher {
    pub fn new(patterns: &[String]) -> Result<Self, MatcherError> {
        let patterns = patterns
            .iter()
            .map(|pattern| Ok((pattern.clone(), Self::compile(pattern)?)))
            .collect::<Result<Vec<_>, MatcherError>>()?;
        Ok(Self { patterns })
    }

    /// Compiles one pattern into an anchored regex with `locale`, `namespace`
    /// and `ext` named groups.
    ///
    /// A pattern whose last segment has no extension accepts any extension.
    pub fn compile(pattern: &str) -> Result<Regex, MatcherError> {
        let mut source = String::from("^");
        let mut rest = pattern;

        while let Some(ch) = rest.chars().next() {
            if ch == '{' {
                let Some(end) = rest.find('}') else {
                    source.push_str(&regex::escape(rest));
                    break;
                };
                let name = rest.get(1..end).unwrap_or_default();
                let group = match name {
                    "locale" => r"(?P<locale>[\w-]+)",
                    "namespace" => r"(?P<namespace>[^/]+)",
                    "namespaces" => r"(?P<namespace>.+)",
                    "ext" => r"(?P<ext>\w+)",
                    _ => {
                        return Err(MatcherError::UnknownPlaceholder {
                            pattern: pattern.to_string(),
                            placeholder: name.to_string(),
                        });
                    }
                };
                source.push_str(group);
                rest = rest.get(end + 1..).unwrap_or_default();
            } else if let Some(after) = rest.strip_prefix("**/") {
                source.push_str("(?:.*/)?");
                rest = after;
            } else if let Some(after) = rest.strip_prefix("**") {
                source.push_str(".*");
                rest = after;
            } else {
                match ch {
                    '*' => source.push_str("[^/]*"),
                    '?' => source.push_str("[^/]"),
                    _ => source.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
                }
                rest = rest.get(ch.len_utf8()..).unwrap_or_default();
            }
        }

        let last_segment = pattern.rsplit('/').next().unwrap_or(pattern);
        if !last_segment.contains('.') {
            source.push_str(r"\.(?P<ext>\w+)");
        }
        source.push('$');

        Regex::new(&source).map_err(|source| MatcherError::InvalidPathPattern {
            pattern: pattern.to_string(),
            source,
        })
    }

    /// Returns the first pattern matching `relative_path`.
    #[must_use]
    pub fn match_path(&self, relative_path: &Path) -> Option<PathMatch> {
        let normalized = relative_path.to_string_lossy().replace('\\', "/");

        self.patterns.iter().find_map(|(pattern, regex)| {
            let captures = regex.captures(&normalized)?;
            let group = |name: &str| captures.name(name).map(|m| m.as_str().to_string());
            Some(PathMatch {
                locale: group("locale"),
                namespace: group("namespace").map(|ns| ns.replace('/', ".")),
                ext: group("ext"),
                matcher: pattern.clone(),
            })
        })
    }
}
