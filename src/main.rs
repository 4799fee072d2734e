//! Entry point for the auto-i18n command line.

use std::path::PathBuf;
use std::process::ExitCode;

use auto_i18n::cli::{
    Arguments,
    ExitStatus,
};
use auto_i18n::commands;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Arguments::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let root = match std::path::absolute(args.root.unwrap_or_else(|| PathBuf::from("."))) {
        Ok(root) => root,
        Err(err) => {
            tracing::error!("Failed to resolve project root: {err}");
            return ExitStatus::Error.into();
        }
    };

    match commands::run(&root, &args.command).await {
        Ok(()) => ExitStatus::Success.into(),
        Err(err) => {
            tracing::error!("{err}");
            ExitStatus::Error.into()
        }
    }
}
