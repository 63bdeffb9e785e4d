// src/tasks/images.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat, ImageResult};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::fs::{relative_slash_path, walk_files, FileSystem};
use crate::types::TaskKind;
use crate::watch::patterns::build_globset;

use super::{BuildTask, TaskReport};

/// Re-encodes JPEGs from `src_dir` into `out_dir`.
#[derive(Debug)]
pub struct ImagesTask {
    fs: Arc<dyn FileSystem>,
    src_dir: PathBuf,
    out_dir: PathBuf,
    include: GlobSet,
    quality: u8,
}

impl ImagesTask {
    pub fn from_config(cfg: &PipelineConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let section = cfg.images();
        let include = build_globset(&section.include)
            .map_err(|e| PipelineError::ConfigError(format!("images.include: {e:#}")))?;

        Ok(Self {
            fs,
            src_dir: cfg.resolve(&section.src_dir),
            out_dir: cfg.resolve(&section.out_dir),
            include,
            quality: section.quality,
        })
    }

    /// Source images selected by the include globs, sorted.
    pub fn sources(&self) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for path in walk_files(self.fs.as_ref(), &self.src_dir)? {
            let matched = relative_slash_path(&self.src_dir, &path)
                .is_some_and(|rel| self.include.is_match(rel.as_str()));
            if matched {
                sources.push(path);
            }
        }
        Ok(sources)
    }

    fn output_path(&self, source: &Path) -> Option<PathBuf> {
        let rel = source.strip_prefix(&self.src_dir).ok()?;
        Some(self.out_dir.join(rel))
    }
}

impl BuildTask for ImagesTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Images
    }

    fn run(&self) -> Result<TaskReport> {
        let mut report = TaskReport::default();

        for source in self.sources()? {
            let Some(out) = self.output_path(&source) else {
                continue;
            };
            let original = self.fs.read(&source)?;

            let bytes = match recompress_jpeg(&original, self.quality) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(image = %source.display(), error = %e, "skipping image");
                    report
                        .warnings
                        .push(format!("{}: {e}", source.display()));
                    continue;
                }
            };

            debug!(
                image = %source.display(),
                before = original.len(),
                after = bytes.len(),
                "compressed image"
            );
            self.fs.write(&out, &bytes)?;
            report.written.push(out);
        }

        Ok(report)
    }
}

/// Decode `bytes` as JPEG and re-encode at `quality`.
///
/// Returns the original bytes when re-encoding does not make the file smaller.
pub fn recompress_jpeg(bytes: &[u8], quality: u8) -> ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
    match img.color() {
        ColorType::L8 => img.to_luma8().write_with_encoder(encoder)?,
        _ => img.to_rgb8().write_with_encoder(encoder)?,
    }

    if encoded.len() < bytes.len() {
        Ok(encoded)
    } else {
        Ok(bytes.to_vec())
    }
}
