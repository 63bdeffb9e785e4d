// src/tasks/markup.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::fs::{relative_slash_path, walk_files, FileSystem};
use crate::pug::{self, PugOptions};
use crate::types::TaskKind;
use crate::watch::patterns::build_globset;

use super::{BuildTask, TaskReport};

/// Compiles every non-partial template under `src_dir` to HTML.
#[derive(Debug)]
pub struct MarkupTask {
    fs: Arc<dyn FileSystem>,
    src_dir: PathBuf,
    out_dir: PathBuf,
    include: GlobSet,
    partial_prefix: String,
    options: PugOptions,
}

impl MarkupTask {
    pub fn from_config(cfg: &PipelineConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let section = cfg.markup();
        let include = build_globset(&section.include)
            .map_err(|e| PipelineError::ConfigError(format!("markup.include: {e:#}")))?;
        let src_dir = cfg.resolve(&section.src_dir);

        Ok(Self {
            fs,
            out_dir: cfg.resolve(&section.out_dir),
            include,
            partial_prefix: section.partial_prefix.clone(),
            options: PugOptions {
                pretty: section.pretty,
                basedir: src_dir.clone(),
            },
            src_dir,
        })
    }

    /// Templates that produce a page, sorted.
    pub fn pages(&self) -> Result<Vec<PathBuf>> {
        let mut pages = Vec::new();
        for path in walk_files(self.fs.as_ref(), &self.src_dir)? {
            let Some(rel) = relative_slash_path(&self.src_dir, &path) else {
                continue;
            };
            if self.is_partial(&path) || !self.include.is_match(&rel) {
                continue;
            }
            pages.push(path);
        }
        Ok(pages)
    }

    /// `out_dir/<path relative to src_dir>` with an `.html` extension.
    pub fn output_path(&self, page: &Path) -> Option<PathBuf> {
        let rel = page.strip_prefix(&self.src_dir).ok()?;
        let mut out = self.out_dir.join(rel);
        out.set_extension("html");
        Some(out)
    }

    fn is_partial(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&self.partial_prefix))
    }
}

impl BuildTask for MarkupTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Markup
    }

    fn run(&self) -> Result<TaskReport> {
        let mut report = TaskReport::default();

        for page in self.pages()? {
            let Some(out) = self.output_path(&page) else {
                continue;
            };
            let html = pug::compile_file(self.fs.as_ref(), &page, &self.options)?;
            self.fs.write(&out, html.as_bytes())?;
            debug!(page = %page.display(), out = %out.display(), "compiled template");
            report.written.push(out);
        }

        Ok(report)
    }
}
