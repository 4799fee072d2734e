//! Runners behind each CLI command.

use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

use crate::catalog::{
    CatalogError,
    KeyGenerator,
    LocaleEntry,
    LocaleLoader,
    ParserRegistry,
};
use crate::cli::{
    CollectArgs,
    Command,
    TranslateArgs,
};
use crate::collect::{
    self,
    CollectError,
};
use crate::config::{
    ConfigError,
    ConfigManager,
    FileMatcher,
    MatcherError,
};
use crate::rewrite::{
    RewriteError,
    SourceRewriter,
};
use crate::workspace;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("Source path does not exist: {}", .0.display())]
    MissingSource(PathBuf),
}

/// Totals of one `translate` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateSummary {
    pub files: usize,
    pub changed: Vec<PathBuf>,
    pub replaced: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Locale files written, empty on a dry run.
    pub written: Vec<PathBuf>,
}

/// Runs `command` against the project at `root`.
pub async fn run(root: &Path, command: &Command) -> Result<(), CommandError> {
    match command {
        Command::Collect(args) => run_collect(root, args).await.map(|_| ()),
        Command::Translate(args) => run_translate(root, args, None).await.map(|_| ()),
    }
}

/// Writes the collection of `args.src` and returns the output path.
pub async fn run_collect(root: &Path, args: &CollectArgs) -> Result<PathBuf, CommandError> {
    let src = root.join(&args.src);
    if !src.exists() {
        return Err(CommandError::MissingSource(src));
    }

    let collection = collect::collect(root, &src, &args.ignore).await?;
    Ok(collect::write_collection(&collection, &root.join(&args.dir), &args.filename).await?)
}

/// Rewrites every source under `args.src` and writes the locale files that gained keys.
///
/// `key_generator` replaces the random key generator.
pub async fn run_translate(
    root: &Path,
    args: &TranslateArgs,
    key_generator: Option<Box<dyn KeyGenerator>>,
) -> Result<TranslateSummary, CommandError> {
    let target = root.join(&args.src);
    if !target.exists() {
        return Err(CommandError::MissingSource(target));
    }

    let mut config_manager = ConfigManager::new();
    config_manager.load_settings(Some(root.to_path_buf()))?;
    let settings = config_manager.get_settings();
    let locale = args.locale.as_deref().unwrap_or(&settings.source_language);

    let registry = ParserRegistry::new();
    let mut loader = LocaleLoader::new(root, settings, &registry)?;
    loader.init().await?;

    let file_matcher = FileMatcher::new(root.to_path_buf(), settings)?;
    let sources: Vec<PathBuf> = workspace::find_source_files(&target, &file_matcher)
        .into_iter()
        .filter(|path| !is_locale_file(path, root, loader.locale_dirs(), loader.files()))
        .collect();

    let mut map = loader.language_map(locale);
    if let Some(key_generator) = key_generator {
        map = map.with_key_generator(key_generator);
    }

    let mut summary = TranslateSummary { files: sources.len(), ..TranslateSummary::default() };
    {
        let mut rewriter = SourceRewriter::new(settings, &mut map)?;
        for path in &sources {
            let hint = args.namespace.clone().or_else(|| file_stem(path));
            match rewriter.translate(path, hint.as_deref(), args.replace).await {
                Ok(report) => {
                    summary.replaced += report.replaced;
                    summary.skipped += report.skipped;
                    if report.changed {
                        summary.changed.push(report.path);
                    }
                }
                Err(err) => {
                    tracing::error!(path = %path.display(), "{err}");
                    summary.failed += 1;
                }
            }
        }
    }

    let dirty: Vec<String> = map.dirty_namespaces().iter().cloned().collect();
    match (args.replace, args.format) {
        (false, _) => {
            tracing::info!(?dirty, locale = %map.locale(), "Dry run, locale files left untouched");
        }
        (true, Some(format)) => {
            for namespace in &dirty {
                summary.written.extend(map.emit(Some(namespace.as_str()), Some(format)).await?);
            }
        }
        (true, None) => summary.written = map.emit_dirty().await?,
    }

    tracing::info!(
        files = summary.files,
        changed = summary.changed.len(),
        replaced = summary.replaced,
        skipped = summary.skipped,
        failed = summary.failed,
        written = summary.written.len(),
        "Translate finished"
    );
    Ok(summary)
}

/// Default namespace hint for a source file.
fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string)
}

/// Loaded locale files and anything under a locale root other than the project root.
fn is_locale_file(path: &Path, root: &Path, locale_dirs: &[PathBuf], files: &[LocaleEntry]) -> bool {
    files.iter().any(|entry| entry.filepath == path)
        || locale_dirs.iter().any(|dir| dir != root && path.starts_with(dir))
}
