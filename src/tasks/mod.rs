// src/tasks/mod.rs

//! The three build tasks run by the pipeline.
//!
//! Each task is a synchronous unit of work behind the [`BuildTask`] trait so
//! the orchestration layer can run it on a blocking thread, and tests can swap
//! in a fake that records invocations.
//!
//! - [`markup`] compiles Pug templates to HTML.
//! - [`styles`] compiles the SCSS entry to vendor-prefixed CSS.
//! - [`images`] re-encodes JPEGs at a fixed quality.

pub mod images;
pub mod markup;
pub mod styles;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::TaskKind;

pub use images::ImagesTask;
pub use markup::MarkupTask;
pub use styles::StylesTask;

/// What a successful task run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Output files written, in the order they were written.
    pub written: Vec<PathBuf>,
    /// Non-fatal problems (e.g. an image that could not be decoded).
    pub warnings: Vec<String>,
}

/// A unit of build work for one category.
pub trait BuildTask: Send + Sync + fmt::Debug {
    fn kind(&self) -> TaskKind;

    /// Run the task to completion. Errors are fatal for this run only.
    fn run(&self) -> Result<TaskReport>;
}

/// One task per category.
#[derive(Debug, Clone)]
pub struct TaskSet {
    markup: Arc<dyn BuildTask>,
    styles: Arc<dyn BuildTask>,
    images: Arc<dyn BuildTask>,
}

impl TaskSet {
    pub fn new(
        markup: Arc<dyn BuildTask>,
        styles: Arc<dyn BuildTask>,
        images: Arc<dyn BuildTask>,
    ) -> Self {
        Self {
            markup,
            styles,
            images,
        }
    }

    /// Build the real tasks from configuration.
    pub fn from_config(cfg: &PipelineConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        Ok(Self::new(
            Arc::new(MarkupTask::from_config(cfg, Arc::clone(&fs))?),
            Arc::new(StylesTask::from_config(cfg, Arc::clone(&fs))),
            Arc::new(ImagesTask::from_config(cfg, fs)?),
        ))
    }

    pub fn get(&self, kind: TaskKind) -> Arc<dyn BuildTask> {
        match kind {
            TaskKind::Markup => Arc::clone(&self.markup),
            TaskKind::Styles => Arc::clone(&self.styles),
            TaskKind::Images => Arc::clone(&self.images),
        }
    }
}
