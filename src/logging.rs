// src/logging.rs

//! Logging setup for `sitepipe` using `tracing` + `tracing-subscriber`.
//!
//! Level selection, first match wins:
//! 1. `--log-level` applies one level to sitepipe's own targets.
//! 2. `SITEPIPE_LOG` is read as a full filter directive, e.g.
//!    `debug` or `sitepipe=debug,tower_http=debug`.
//! 3. `info` for sitepipe.
//!
//! HTTP request traces from `tower_http` stay at `warn` unless a directive
//! names them. Logs go to STDERR.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const ENV_VAR: &str = "SITEPIPE_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => default_filter(level.as_str()),
        None => match std::env::var(ENV_VAR) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
                .with_context(|| format!("invalid {ENV_VAR} value {directives:?}"))?,
            _ => default_filter("info"),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// `level` for everything, with request tracing kept quiet.
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},tower_http=warn"))
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
