//! auto-i18n
//!
//! Moves hard-coded UI text out of Vue / JavaScript / TypeScript sources into
//! locale catalogs and rewrites the sources to call a translation function.

pub mod catalog;
pub mod cli;
pub mod collect;
pub mod commands;
pub mod config;
pub mod fsutil;
pub mod rewrite;
pub mod workspace;
