// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model with the built-in defaults (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate value ranges and glob syntax (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ImagesSection, MarkupSection, PipelineConfig, RawPipelineConfig, ServerSection,
    StylesSection, WatchSection,
};
