//! Catalog error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::MatcherError;

/// Errors raised while reading or writing a single locale file's syntax.
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Error when failing to set the language for the parser
    #[error("Failed to set language for parser: {0}")]
    LanguageSetup(#[from] tree_sitter::LanguageError),

    #[error("Failed to parse source code")]
    ParseFailed,

    #[error("No exported object literal found")]
    MissingExport,

    #[error("Unsupported {kind} at byte {offset}")]
    UnsupportedValue { kind: String, offset: usize },

    #[error("Locale data must be an object")]
    NotAnObject,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("Failed to serialize namespace '{namespace}': {source}")]
    Serialize {
        namespace: String,
        #[source]
        source: ParserError,
    },

    #[error("No parser registered for '{0}' files")]
    UnsupportedFormat(String),

    #[error("Could not mint a unique key in namespace '{namespace}' after {attempts} attempts")]
    KeyExhausted { namespace: String, attempts: usize },
}
