//! Project configuration: settings, their on-disk loader, and path matchers.
/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Source and locale path matchers
mod matcher;
/// Configuration types and settings
mod types;

pub use manager::ConfigManager;
pub use matcher::{
    FileMatcher,
    MatcherError,
    PathMatch,
    PathMatcher,
    build_glob_set,
};
pub use types::{
    ConfigError,
    I18nSettings,
    OutputFormat,
    TranslateFunctions,
    ValidationError,
};

/// File name of the project configuration, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = ".auto-i18n.json";
