//! Collects hard-coded text from sources without touching them.

use std::collections::BTreeMap;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::LazyLock;

use ignore::WalkBuilder;
use regex::Regex;
use thiserror::Error;

use crate::catalog::keygen::{
    RANDOM_KEY_LENGTH,
    random_id,
};
use crate::catalog::template::canonicalize;
use crate::fsutil;

/// A run starting with a character above U+00FF, up to the next quote or tag bracket.
#[allow(clippy::unwrap_used)] // constant pattern
static TEXT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\x00-\xff]+[^<>"'`]*"#).unwrap());
/// Debug output is never collected.
#[allow(clippy::unwrap_used)] // constant pattern
static CONSOLE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"console\.log\(.*\)").unwrap());

/// Extensions scanned by [`find_sources`].
pub const COLLECT_EXTENSIONS: [&str; 2] = ["vue", "js"];

/// Opening and closing delimiters of block comments.
const BLOCK_COMMENTS: [(&str, &str); 2] = [("/*", "*/"), ("<!--", "-->")];

/// File path relative to the project root → random key → text.
pub type Collection = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize collection: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Line-by-line text finder that remembers open block comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineScanner {
    /// Closing delimiter of the block comment still open.
    open_comment: Option<&'static str>,
}

impl LineScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translatable runs of `line`, in order.
    pub fn scan_line(&mut self, line: &str) -> Vec<String> {
        let code = self.strip_comments(&CONSOLE_REGEX.replace_all(line, ""));
        TEXT_REGEX
            .find_iter(&code)
            .map(|m| canonicalize(m.as_str().trim()).text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// `line` without comment text, carrying open block comments to the next line.
    fn strip_comments(&mut self, line: &str) -> String {
        let mut out = String::new();
        let mut rest = line;

        loop {
            if let Some(close) = self.open_comment {
                let Some(end) = rest.find(close) else {
                    break;
                };
                rest = rest.get(end + close.len()..).unwrap_or_default();
                self.open_comment = None;
                continue;
            }

            let block = BLOCK_COMMENTS
                .iter()
                .filter_map(|(open, close)| rest.find(open).map(|at| (at, *open, *close)))
                .min_by_key(|(at, _, _)| *at);
            let line_comment = find_line_comment(rest);

            match (block, line_comment) {
                (Some((at, open, close)), line_at) if line_at.is_none_or(|l| at < l) => {
                    out.push_str(rest.get(..at).unwrap_or_default());
                    rest = rest.get(at + open.len()..).unwrap_or_default();
                    self.open_comment = Some(close);
                }
                (_, Some(line_at)) => {
                    out.push_str(rest.get(..line_at).unwrap_or_default());
                    break;
                }
                _ => {
                    out.push_str(rest);
                    break;
                }
            }
        }
        out
    }
}

/// `//` that starts a comment; `://` in URLs does not.
fn find_line_comment(text: &str) -> Option<usize> {
    text.match_indices("//")
        .map(|(at, _)| at)
        .find(|&at| !text.get(..at).is_some_and(|before| before.ends_with(':')))
}

/// Distinct texts of a whole file, in first-seen order.
#[must_use]
pub fn scan_source(text: &str) -> Vec<String> {
    let mut scanner = LineScanner::new();
    let mut found: Vec<String> = Vec::new();
    for line in text.lines() {
        for text in scanner.scan_line(line) {
            if !found.contains(&text) {
                found.push(text);
            }
        }
    }
    found
}

/// `.vue` and `.js` files under `src`, skipping entries named in `ignore`.
#[must_use]
pub fn find_sources(src: &Path, ignore: &[String]) -> Vec<PathBuf> {
    let ignore = ignore.to_vec();
    let walker = WalkBuilder::new(src)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            entry.depth() == 0
                || !entry.file_name().to_str().is_some_and(|name| ignore.iter().any(|i| i == name))
        })
        .build();

    walker
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| COLLECT_EXTENSIONS.contains(&ext))
        })
        .collect()
}

/// Scans every source under `src`, keying files by their path relative to `root`.
pub async fn collect(
    root: &Path,
    src: &Path,
    ignore: &[String],
) -> Result<Collection, CollectError> {
    let mut collection = Collection::new();
    for path in find_sources(src, ignore) {
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CollectError::Io { path: path.clone(), source })?;

        let mut entries = BTreeMap::new();
        for found in scan_source(&text) {
            let key = loop {
                let key = random_id(RANDOM_KEY_LENGTH);
                if !entries.contains_key(&key) {
                    break key;
                }
            };
            entries.insert(key, found);
        }
        tracing::debug!(path = %path.display(), texts = entries.len(), "Source scanned");
        let relative = path.strip_prefix(root).unwrap_or(&path);
        collection.insert(relative.display().to_string(), entries);
    }
    Ok(collection)
}

/// Writes `<dir>/<filename>.json`.
pub async fn write_collection(
    collection: &Collection,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, CollectError> {
    let path = dir.join(format!("{filename}.json"));
    let mut text = serde_json::to_string_pretty(collection)?;
    text.push('\n');
    fsutil::write_replace(&path, &text)
        .await
        .map_err(|source| CollectError::Io { path: path.clone(), source })?;

    let texts: usize = collection.values().map(BTreeMap::len).sum();
    tracing::info!(path = %path.display(), files = collection.len(), texts, "Collection written");
    Ok(path)
}
