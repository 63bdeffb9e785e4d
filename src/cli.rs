// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_config_path;
use crate::types::OpenMode;

/// Command-line arguments for `sitepipe`.
///
/// Every flag is optional: running `sitepipe` with no arguments builds the
/// site and starts the watcher and dev server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build Pug/SCSS/JPEG sources into dist/ and serve them with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If the file does not exist the built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run the initial build only; do not watch or serve.
    #[arg(long)]
    pub once: bool,

    /// How to open the start page (external, local, none).
    ///
    /// Overrides `[server].open` from the config file.
    #[arg(long, value_name = "MODE")]
    pub open: Option<OpenMode>,

    /// Do not open a browser when the dev server starts. Same as `--open none`.
    #[arg(long, conflicts_with = "open")]
    pub no_open: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// The open mode to use, given the one from the config file.
    pub fn open_mode(&self, configured: OpenMode) -> OpenMode {
        if self.no_open {
            OpenMode::None
        } else {
            self.open.unwrap_or(configured)
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
