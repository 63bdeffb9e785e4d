// src/engine/core.rs

//! Pure core state machines.
//!
//! These consume events and produce an updated state plus a list of
//! "commands" describing what the IO shell should do next. The async shell
//! (`engine::runtime`) is responsible for:
//! - reading events from channels
//! - running tasks on blocking threads
//! - broadcasting reloads
//!
//! Neither core owns channels, Tokio types, or performs any IO, so both can be
//! unit tested directly.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::engine::queue::PendingChanges;
use crate::engine::{CoreCommand, CoreStep, RebuildEvent, TaskOutcome};
use crate::types::TaskKind;

/// What the startup sequence should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    /// Run this category's task and report the outcome via [`StartupCore::record`].
    RunTask(TaskKind),
    /// Every task succeeded; start watching.
    EnterWatchPhase,
    /// A task failed; stop without entering the watch phase.
    Abort(TaskKind),
}

/// Initial build: each category once, in order, stopping at the first failure.
#[derive(Debug)]
pub struct StartupCore {
    order: Vec<TaskKind>,
    next: usize,
    failed: Option<TaskKind>,
}

impl Default for StartupCore {
    fn default() -> Self {
        Self::new(TaskKind::ALL.to_vec())
    }
}

impl StartupCore {
    pub fn new(order: Vec<TaskKind>) -> Self {
        Self {
            order,
            next: 0,
            failed: None,
        }
    }

    pub fn next_step(&self) -> StartupStep {
        if let Some(kind) = self.failed {
            return StartupStep::Abort(kind);
        }
        match self.order.get(self.next) {
            Some(&kind) => StartupStep::RunTask(kind),
            None => StartupStep::EnterWatchPhase,
        }
    }

    /// Record the outcome of the task returned by the last `next_step`.
    pub fn record(&mut self, kind: TaskKind, outcome: TaskOutcome) {
        if self.failed.is_some() || self.order.get(self.next) != Some(&kind) {
            warn!(task = %kind, "ignoring outcome for a task that is not running");
            return;
        }
        if outcome.is_success() {
            self.next += 1;
        } else {
            self.failed = Some(kind);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebuildState {
    Idle,
    Running,
}

/// Watch-phase state for one category.
///
/// - A change while idle starts a rebuild.
/// - Changes while a rebuild runs are coalesced into one follow-up rebuild.
/// - A successful rebuild (warnings allowed) is followed by a reload; a
///   failed one is not.
#[derive(Debug)]
pub struct RebuildCore {
    kind: TaskKind,
    state: RebuildState,
    pending: PendingChanges,
}

impl RebuildCore {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            state: RebuildState::Idle,
            pending: PendingChanges::new(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Whether a rebuild is in flight.
    pub fn is_running(&self) -> bool {
        self.state == RebuildState::Running
    }

    /// Whether a follow-up rebuild is queued.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn step(&mut self, event: RebuildEvent) -> CoreStep {
        match event {
            RebuildEvent::ChangeObserved { path } => self.on_change(path),
            RebuildEvent::RebuildFinished { outcome } => self.on_finished(outcome),
            RebuildEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn on_change(&mut self, path: PathBuf) -> CoreStep {
        let commands = match self.state {
            RebuildState::Idle => {
                info!(task = %self.kind, path = %path.display(), "change detected; rebuilding");
                self.state = RebuildState::Running;
                vec![CoreCommand::StartRebuild {
                    changed: vec![path],
                }]
            }
            RebuildState::Running => {
                self.pending.record(path);
                Vec::new()
            }
        };
        CoreStep {
            commands,
            keep_running: true,
        }
    }

    fn on_finished(&mut self, outcome: TaskOutcome) -> CoreStep {
        if self.state != RebuildState::Running {
            debug!(task = %self.kind, "rebuild finished while idle; ignoring");
            return CoreStep {
                commands: Vec::new(),
                keep_running: true,
            };
        }

        let mut commands = Vec::new();
        if outcome.is_success() {
            commands.push(CoreCommand::Reload { kind: self.kind });
        }

        if self.pending.is_empty() {
            self.state = RebuildState::Idle;
        } else {
            let changed = self.pending.drain();
            info!(task = %self.kind, changes = changed.len(), "starting follow-up rebuild");
            commands.push(CoreCommand::StartRebuild { changed });
        }

        CoreStep {
            commands,
            keep_running: true,
        }
    }
}
