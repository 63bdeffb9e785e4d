use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use sitepipe::engine::ReloadSink;
use sitepipe::errors::{PipelineError, Result};
use sitepipe::tasks::{BuildTask, TaskReport, TaskSet};
use sitepipe::types::TaskKind;

/// Scripted result of one `FakeTask::run` call.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Succeed,
    SucceedWithWarning(String),
    Fail(String),
}

/// A fake build task that:
/// - records every run into a shared log (so order across tasks is visible)
/// - returns scripted outcomes, then succeeds once the script runs out
/// - optionally sleeps to simulate a slow build
#[derive(Debug)]
pub struct FakeTask {
    kind: TaskKind,
    log: Arc<Mutex<Vec<TaskKind>>>,
    outcomes: Mutex<VecDeque<FakeOutcome>>,
    delay: Duration,
}

impl FakeTask {
    pub fn new(kind: TaskKind, log: Arc<Mutex<Vec<TaskKind>>>) -> Self {
        Self {
            kind,
            log,
            outcomes: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = FakeOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = outcomes.into_iter().collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl BuildTask for FakeTask {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn run(&self) -> Result<TaskReport> {
        self.log.lock().unwrap().push(self.kind);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FakeOutcome::Succeed);

        let written = vec![PathBuf::from(format!("dist/{}.out", self.kind))];
        match outcome {
            FakeOutcome::Succeed => Ok(TaskReport {
                written,
                warnings: Vec::new(),
            }),
            FakeOutcome::SucceedWithWarning(w) => Ok(TaskReport {
                written,
                warnings: vec![w],
            }),
            FakeOutcome::Fail(msg) => Err(PipelineError::Other(anyhow!(msg))),
        }
    }
}

/// A task set of three fakes sharing one run log.
pub fn fake_task_set(
    markup: FakeTask,
    styles: FakeTask,
    images: FakeTask,
) -> TaskSet {
    TaskSet::new(Arc::new(markup), Arc::new(styles), Arc::new(images))
}

/// Records reloads instead of talking to browsers.
#[derive(Debug, Default)]
pub struct RecordingReloader {
    reloads: Mutex<Vec<TaskKind>>,
}

impl RecordingReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reloads(&self) -> Vec<TaskKind> {
        self.reloads.lock().unwrap().clone()
    }
}

impl ReloadSink for RecordingReloader {
    fn reload(&self, kind: TaskKind) {
        self.reloads.lock().unwrap().push(kind);
    }
}
