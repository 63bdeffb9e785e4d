// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::PipelineConfig;
use crate::types::TaskKind;

/// Build a GlobSet from simple string patterns.
///
/// `*` does not cross `/`; use `**` for recursive matches.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Watch patterns for one build category.
#[derive(Clone)]
pub struct WatchRegistration {
    kind: TaskKind,
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for WatchRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistration")
            .field("kind", &self.kind)
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl WatchRegistration {
    pub fn new(kind: TaskKind, patterns: Vec<String>) -> Result<Self> {
        let set = build_globset(&patterns)
            .with_context(|| format!("building watch patterns for {kind}"))?;
        Ok(Self {
            kind,
            patterns,
            set,
        })
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `rel_path` is relative to the project root, with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    /// Directories (relative to the project root) that must be watched for
    /// these patterns: the literal prefix of each glob.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.patterns.iter().map(|p| literal_prefix(p)).collect()
    }
}

/// Maps a changed path to the categories that watch it.
#[derive(Debug, Clone)]
pub struct WatchRouter {
    registrations: Vec<WatchRegistration>,
}

impl WatchRouter {
    pub fn new(registrations: Vec<WatchRegistration>) -> Self {
        Self { registrations }
    }

    /// One registration per category, from the `watch` lists in the config.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(vec![
            WatchRegistration::new(TaskKind::Markup, cfg.markup().watch.clone())?,
            WatchRegistration::new(TaskKind::Styles, cfg.styles().watch.clone())?,
            WatchRegistration::new(TaskKind::Images, cfg.images().watch.clone())?,
        ]))
    }

    /// Categories whose patterns match `rel_path`; empty when nothing does.
    pub fn route(&self, rel_path: &str) -> Vec<TaskKind> {
        self.registrations
            .iter()
            .filter(|r| r.matches(rel_path))
            .map(|r| r.kind)
            .collect()
    }

    /// Every directory to watch, deduplicated, relative to the project root.
    pub fn roots(&self) -> Vec<PathBuf> {
        let roots: BTreeSet<PathBuf> = self
            .registrations
            .iter()
            .flat_map(WatchRegistration::roots)
            .collect();
        roots.into_iter().collect()
    }
}

/// Leading path components of `pattern` that contain no glob syntax.
///
/// `src/img/**` -> `src/img`, `**/*.pug` -> `.`.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut components = pattern.split('/').peekable();
    while let Some(component) = components.next() {
        // The final component names files, not a directory.
        if components.peek().is_none() || component.contains(['*', '?', '[', '{']) {
            break;
        }
        if !component.is_empty() && component != "." {
            prefix.push(component);
        }
    }
    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_prefix_stops_at_glob() {
        assert_eq!(literal_prefix("src/img/**"), PathBuf::from("src/img"));
        assert_eq!(literal_prefix("src/pug/**/*.pug"), PathBuf::from("src/pug"));
        assert_eq!(literal_prefix("**/*.pug"), PathBuf::from("."));
        assert_eq!(literal_prefix("src/scss/style.scss"), PathBuf::from("src/scss"));
    }
}
