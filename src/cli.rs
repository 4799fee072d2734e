//! Command-line surface.
//!
//! - `collect`: scan sources for hard-coded text into one JSON file
//! - `translate`: move hard-coded text into the locale catalog and rewrite sources

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{
    Args,
    Parser,
    Subcommand,
};

use crate::config::OutputFormat;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    /// Project root holding `.auto-i18n.json` (default: current directory)
    #[arg(long, global = true, env = "AUTO_I18N_ROOT")]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect hard-coded text from `.vue` and `.js` files without changing them
    #[command(alias = "getlang")]
    Collect(CollectArgs),
    /// Replace hard-coded text with translation calls and add it to the locale files
    Translate(TranslateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CollectArgs {
    /// Source directory to scan
    pub src: PathBuf,

    /// Directory for the output file
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Output file name, without extension
    #[arg(short, long, default_value = "zh")]
    pub filename: String,

    /// File or directory names to skip, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TranslateArgs {
    /// Source file or directory to translate
    pub src: PathBuf,

    /// Namespace for new keys (default: each file's stem)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Locale receiving new keys (default: sourceLanguage)
    #[arg(long)]
    pub locale: Option<String>,

    /// Write rewritten sources back (default is dry-run)
    #[arg(long)]
    pub replace: bool,

    /// Output format for every touched locale file
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Process exit status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Command failed; the cause has been logged.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Error => Self::from(1),
        }
    }
}
