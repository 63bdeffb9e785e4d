// src/pug/mod.rs

//! Compiler for the static subset of the Pug template language.
//!
//! The pipeline is:
//! - [`lexer`] splits a file into indented source lines.
//! - [`parser`] turns those lines into an AST ([`ast`]).
//! - [`resolve`] expands `include` and `extends`/`block`.
//! - [`render`] prints HTML, optionally indented.
//!
//! Only constructs that can be evaluated without a JavaScript runtime are
//! supported; code lines, conditionals, loops and mixins are rejected with a
//! [`PugError`] that names the construct.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod resolve;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::fs::FileSystem;

/// Options for a single compilation.
#[derive(Debug, Clone)]
pub struct PugOptions {
    /// Indent output (`pretty: true` in Pug terms).
    pub pretty: bool,
    /// Directory that absolute includes (`include /x`) resolve against.
    pub basedir: PathBuf,
}

impl Default for PugOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            basedir: PathBuf::from("."),
        }
    }
}

/// A compile error, located at a file and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PugError {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

impl PugError {
    pub fn new(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for PugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.message)
    }
}

impl std::error::Error for PugError {}

/// Compile the template at `path` into HTML.
pub fn compile_file(
    fs: &dyn FileSystem,
    path: &Path,
    options: &PugOptions,
) -> Result<String, PugError> {
    let mut resolver = resolve::Resolver::new(fs, &options.basedir);
    let nodes = resolver.resolve_file(path)?;
    Ok(render::render(&nodes, options.pretty))
}

/// Compile template source that is not backed by a file.
///
/// Includes and extends are resolved relative to `virtual_path`'s directory.
pub fn compile_str(
    fs: &dyn FileSystem,
    source: &str,
    virtual_path: &Path,
    options: &PugOptions,
) -> Result<String, PugError> {
    let mut resolver = resolve::Resolver::new(fs, &options.basedir);
    let nodes = resolver.resolve_source(source, virtual_path)?;
    Ok(render::render(&nodes, options.pretty))
}
