// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::pug::PugError;
use crate::types::TaskKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Template error: {0}")]
    Template(#[from] PugError),

    #[error("Stylesheet error in {path:?}: {message}")]
    Stylesheet { path: PathBuf, message: String },

    #[error("initial {kind} build failed: {source}")]
    InitialBuild {
        kind: TaskKind,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
