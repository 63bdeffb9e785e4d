// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::errors::{PipelineError, Result};
use crate::tasks::{BuildTask, TaskReport, TaskSet};
use crate::types::TaskKind;

use super::core::{RebuildCore, StartupCore, StartupStep};
use super::{CoreCommand, RebuildEvent, TaskOutcome};

/// Where reload notifications go once a rebuild succeeds.
///
/// Production code uses the dev server's live-reload hub; tests can record
/// calls instead.
pub trait ReloadSink: Send + Sync {
    fn reload(&self, kind: TaskKind);
}

/// Run every category once, in order, awaiting each before the next.
///
/// The first failing task aborts the build and its error is returned.
pub async fn run_initial_build(tasks: &TaskSet) -> Result<Vec<(TaskKind, TaskReport)>> {
    let mut core = StartupCore::default();
    let mut reports = Vec::new();

    loop {
        match core.next_step() {
            StartupStep::RunTask(kind) => {
                let started = Instant::now();
                match run_task(tasks.get(kind)).await {
                    Ok(report) => {
                        log_report(kind, &report, started);
                        core.record(kind, TaskOutcome::Succeeded {
                            warnings: report.warnings.len(),
                        });
                        reports.push((kind, report));
                    }
                    Err(err) => {
                        error!(task = %kind, error = %err, "initial build failed");
                        core.record(kind, TaskOutcome::Failed);
                        return Err(PipelineError::InitialBuild {
                            kind,
                            source: Box::new(err),
                        });
                    }
                }
            }
            StartupStep::EnterWatchPhase => {
                info!("initial build complete");
                return Ok(reports);
            }
            StartupStep::Abort(kind) => {
                return Err(PipelineError::InitialBuild {
                    kind,
                    source: Box::new(PipelineError::Other(anyhow!("task reported failure"))),
                });
            }
        }
    }
}

/// Run a task on the blocking pool.
async fn run_task(task: Arc<dyn BuildTask>) -> Result<TaskReport> {
    tokio::task::spawn_blocking(move || task.run())
        .await
        .map_err(|e| PipelineError::Other(anyhow!("task did not complete: {e}")))?
}

fn log_report(kind: TaskKind, report: &TaskReport, started: Instant) {
    for warning in &report.warnings {
        warn!(task = %kind, "{warning}");
    }
    info!(
        task = %kind,
        written = report.written.len(),
        warnings = report.warnings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "task finished"
    );
}

/// Watch-phase loop for one category.
///
/// This is a pure IO shell around [`RebuildCore`]: it turns incoming changed
/// paths and rebuild completions into events, and carries out the commands the
/// core returns (start the task, broadcast a reload).
pub struct RebuildLoop {
    core: RebuildCore,
    task: Arc<dyn BuildTask>,
    change_rx: mpsc::UnboundedReceiver<PathBuf>,
    reloader: Arc<dyn ReloadSink>,
}

impl fmt::Debug for RebuildLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebuildLoop")
            .field("core", &self.core)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl RebuildLoop {
    pub fn new(
        task: Arc<dyn BuildTask>,
        change_rx: mpsc::UnboundedReceiver<PathBuf>,
        reloader: Arc<dyn ReloadSink>,
    ) -> Self {
        Self {
            core: RebuildCore::new(task.kind()),
            task,
            change_rx,
            reloader,
        }
    }

    /// Main event loop; returns once the change channel closes.
    pub async fn run(mut self) -> Result<()> {
        let kind = self.core.kind();
        info!(task = %kind, "rebuild loop started");

        let mut in_flight: Option<JoinHandle<Result<TaskReport>>> = None;
        let mut started = Instant::now();

        loop {
            let event = tokio::select! {
                change = self.change_rx.recv() => match change {
                    Some(path) => RebuildEvent::ChangeObserved { path },
                    None => RebuildEvent::ShutdownRequested,
                },
                joined = wait_for(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    RebuildEvent::RebuildFinished {
                        outcome: outcome_of(kind, joined, started),
                    }
                }
            };

            debug!(task = %kind, ?event, "rebuild loop received event");
            let step = self.core.step(event);

            for command in step.commands {
                match command {
                    CoreCommand::StartRebuild { changed } => {
                        debug!(task = %kind, ?changed, "starting rebuild");
                        let task = Arc::clone(&self.task);
                        started = Instant::now();
                        in_flight = Some(tokio::task::spawn_blocking(move || task.run()));
                    }
                    CoreCommand::Reload { kind } => self.reloader.reload(kind),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        // Blocking tasks cannot be cancelled; let a running one finish writing.
        if let Some(handle) = in_flight {
            let _ = handle.await;
        }

        info!(task = %kind, "rebuild loop exiting");
        Ok(())
    }
}

async fn wait_for<T>(handle: &mut Option<JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn outcome_of(
    kind: TaskKind,
    joined: std::result::Result<Result<TaskReport>, JoinError>,
    started: Instant,
) -> TaskOutcome {
    match joined {
        Ok(Ok(report)) => {
            log_report(kind, &report, started);
            TaskOutcome::Succeeded {
                warnings: report.warnings.len(),
            }
        }
        Ok(Err(err)) => {
            error!(task = %kind, error = %err, "rebuild failed");
            TaskOutcome::Failed
        }
        Err(err) => {
            error!(task = %kind, error = %err, "rebuild did not complete");
            TaskOutcome::Failed
        }
    }
}
