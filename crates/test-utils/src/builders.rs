#![allow(dead_code)]

use std::path::PathBuf;

use sitepipe::config::{PipelineConfig, RawPipelineConfig};
use sitepipe::types::OpenMode;

/// Builder for `PipelineConfig` to simplify test setup.
///
/// Starts from the built-in defaults; every setter overrides one key.
pub struct PipelineConfigBuilder {
    config: RawPipelineConfig,
    root: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawPipelineConfig::default(),
            root: None,
        }
    }

    /// Root every relative path at `root` (e.g. a temp dir).
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn markup_src(mut self, dir: &str) -> Self {
        self.config.markup.src_dir = PathBuf::from(dir);
        self
    }

    pub fn markup_out(mut self, dir: &str) -> Self {
        self.config.markup.out_dir = PathBuf::from(dir);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.markup.pretty = pretty;
        self
    }

    pub fn partial_prefix(mut self, prefix: &str) -> Self {
        self.config.markup.partial_prefix = prefix.to_string();
        self
    }

    pub fn styles_entry(mut self, entry: &str) -> Self {
        self.config.styles.entry = PathBuf::from(entry);
        self
    }

    pub fn styles_out(mut self, dir: &str) -> Self {
        self.config.styles.out_dir = PathBuf::from(dir);
        self
    }

    pub fn browsers(mut self, queries: &[&str]) -> Self {
        self.config.styles.browsers = queries.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn images_src(mut self, dir: &str) -> Self {
        self.config.images.src_dir = PathBuf::from(dir);
        self
    }

    pub fn images_out(mut self, dir: &str) -> Self {
        self.config.images.out_dir = PathBuf::from(dir);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.images.quality = quality;
        self
    }

    pub fn markup_watch(mut self, patterns: &[&str]) -> Self {
        self.config.markup.watch = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn open(mut self, mode: OpenMode) -> Self {
        self.config.server.open = mode;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.server.host = host.to_string();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn raw(self) -> RawPipelineConfig {
        self.config
    }

    pub fn build(self) -> PipelineConfig {
        let config =
            PipelineConfig::try_from(self.config).expect("Failed to build valid config from builder");
        match self.root {
            Some(root) => config.with_root(root),
            None => config,
        }
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
