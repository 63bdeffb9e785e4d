// src/engine/queue.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

/// Changes that arrive while a rebuild is already running.
///
/// Semantics:
/// - Every change recorded during a rebuild belongs to one batch; the batch
///   becomes a single follow-up rebuild when the current one finishes.
/// - The same path changing several times is recorded once.
/// - `drain` empties the batch, returning its paths in sorted order.
#[derive(Debug, Default)]
pub struct PendingChanges {
    paths: BTreeSet<PathBuf>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no follow-up rebuild is pending.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Record that `path` changed while a rebuild is in progress.
    pub fn record(&mut self, path: PathBuf) {
        let shown = path.display().to_string();
        let inserted = self.paths.insert(path);
        debug!(
            path = %shown,
            inserted,
            pending = self.len(),
            "queued change for follow-up rebuild"
        );
    }

    /// Take every pending path, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        let paths: Vec<PathBuf> = std::mem::take(&mut self.paths).into_iter().collect();
        debug!(drained = paths.len(), "drained queued changes into new rebuild");
        paths
    }
}
