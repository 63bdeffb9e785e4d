// src/config/validate.rs

use std::path::Path;

use globset::Glob;

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::{PipelineError, Result};

/// Upper bound for `[watch].debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 10_000;

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawPipelineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawPipelineConfig) -> Result<()> {
    validate_markup(cfg)?;
    validate_styles(cfg)?;
    validate_images(cfg)?;
    validate_server(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn validate_markup(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.markup.partial_prefix.is_empty() {
        return Err(PipelineError::ConfigError(
            "[markup].partial_prefix must not be empty".to_string(),
        ));
    }
    validate_globs("[markup].include", &cfg.markup.include)?;
    validate_globs("[markup].watch", &cfg.markup.watch)?;
    Ok(())
}

fn validate_styles(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.styles.browsers.iter().all(|b| b.trim().is_empty()) {
        return Err(PipelineError::ConfigError(
            "[styles].browsers must contain at least one query".to_string(),
        ));
    }
    if cfg.styles.entry.file_stem().is_none() {
        return Err(PipelineError::ConfigError(format!(
            "[styles].entry has no file name: {:?}",
            cfg.styles.entry
        )));
    }
    validate_globs("[styles].watch", &cfg.styles.watch)?;
    Ok(())
}

fn validate_images(cfg: &RawPipelineConfig) -> Result<()> {
    if !(1..=100).contains(&cfg.images.quality) {
        return Err(PipelineError::ConfigError(format!(
            "[images].quality must be within 1..=100 (got {})",
            cfg.images.quality
        )));
    }
    validate_globs("[images].include", &cfg.images.include)?;
    validate_globs("[images].watch", &cfg.images.watch)?;
    Ok(())
}

fn validate_server(cfg: &RawPipelineConfig) -> Result<()> {
    let start = cfg.server.start_path.trim();
    if start.is_empty() {
        return Err(PipelineError::ConfigError(
            "[server].start_path must not be empty".to_string(),
        ));
    }
    if Path::new(start).is_absolute() || start.starts_with('/') {
        return Err(PipelineError::ConfigError(format!(
            "[server].start_path must be relative to base_dir (got {start:?})"
        )));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.watch.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(PipelineError::ConfigError(format!(
            "[watch].debounce_ms must be <= {MAX_DEBOUNCE_MS} (got {})",
            cfg.watch.debounce_ms
        )));
    }
    Ok(())
}

fn validate_globs(field: &str, patterns: &[String]) -> Result<()> {
    if patterns.is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "{field} must contain at least one glob"
        )));
    }
    for pat in patterns {
        Glob::new(pat).map_err(|e| {
            PipelineError::ConfigError(format!("{field}: invalid glob {pat:?}: {e}"))
        })?;
    }
    Ok(())
}
