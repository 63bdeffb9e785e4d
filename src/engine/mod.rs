// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the initial build (every category once, in order, fatal on error)
//! - one rebuild loop per category during the watch phase, reacting to:
//!   - debounced file changes
//!   - rebuild completion
//!   - shutdown
//!
//! The pure state machines live in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;

use crate::types::TaskKind;

/// Outcome of one task run, as seen by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task finished; `warnings` non-fatal problems were reported.
    Succeeded { warnings: usize },
    Failed,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

/// Events flowing into a category's rebuild loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildEvent {
    /// A watched path changed (after debouncing).
    ChangeObserved { path: PathBuf },
    /// The in-flight rebuild finished.
    RebuildFinished { outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C or the watcher went away).
    ShutdownRequested,
}

/// Instructions from a core to its IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run the category's task; `changed` lists the paths that caused it.
    StartRebuild { changed: Vec<PathBuf> },
    /// Tell connected browsers to reload.
    Reload { kind: TaskKind },
}

/// Result of feeding one event into a core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

pub mod core;
pub mod queue;
pub mod runtime;

pub use core::{RebuildCore, StartupCore, StartupStep};
pub use queue::PendingChanges;
pub use runtime::{run_initial_build, RebuildLoop, ReloadSink};
