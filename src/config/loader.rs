// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawPipelineConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawPipelineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Relative paths in the result are rooted at the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = PipelineConfig::try_from(raw_config)?;
    Ok(config.with_root(config_root_dir(path)))
}

/// Load `path` if it exists, otherwise fall back to the built-in defaults
/// rooted at the current working directory.
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    if path.is_file() {
        info!(path = ?path, "loading config");
        return load_and_validate(path);
    }

    info!(path = ?path, "no config file found; using built-in defaults");
    Ok(PipelineConfig::defaults().with_root(config_root_dir(path)))
}

/// Default config file name, looked up in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitepipe.toml")
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitepipe.toml" (parent = ""),
///   we fall back to the current working directory ".".
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
