// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::TaskKind;
use crate::watch::debouncer::{ChangeKind, EventDebouncer};
use crate::watch::path_utils::{is_temp_file, relative_str};
use crate::watch::patterns::WatchRouter;

/// Handle for the filesystem watchers.
///
/// This exists mainly so the underlying `RecommendedWatcher`s are kept alive
/// for as long as needed. Dropping this handle stops file watching, which in
/// turn closes every category channel.
pub struct WatcherHandle {
    _inner: Vec<RecommendedWatcher>,
    watched: Vec<PathBuf>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("watched", &self.watched)
            .finish()
    }
}

impl WatcherHandle {
    /// Directories that are actually being watched.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Spawn filesystem watchers for every root named by `router` and forward
/// debounced changes to the matching category channels.
///
/// - `root` is the project root against which all glob patterns are evaluated.
/// - `senders` holds one channel per category; paths are sent relative to `root`.
/// - Each source directory gets its own watcher. A directory that does not
///   exist yet is watched through its nearest existing ancestor, so it is
///   picked up once created. One that cannot be watched is logged and skipped.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    router: WatchRouter,
    senders: HashMap<TaskKind, mpsc::UnboundedSender<PathBuf>>,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callbacks into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watchers = Vec::new();
    let mut watched = Vec::new();
    let dirs = router
        .roots()
        .into_iter()
        .map(|dir| {
            let found = nearest_existing(&root, &dir);
            if found != dir {
                info!("{:?} does not exist yet; watching {:?} instead", dir, found);
            }
            found
        })
        .collect();

    for dir in outermost(dirs) {
        let abs = if dir == Path::new(".") {
            root.clone()
        } else {
            root.join(&dir)
        };
        match watch_dir(&abs, event_tx.clone()) {
            Ok(watcher) => {
                info!("watching {:?}", abs);
                watchers.push(watcher);
                watched.push(abs);
            }
            Err(err) => warn!("cannot watch {:?}: {err:#}", abs),
        }
    }
    drop(event_tx);

    if watchers.is_empty() {
        warn!("no source directories could be watched; changes will not trigger rebuilds");
    }

    let debouncer = EventDebouncer::new(debounce);

    tokio::spawn(async move {
        loop {
            let next_deadline = debouncer.next_deadline();

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    debug!(?event, "received notify event");
                    let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                        continue;
                    };
                    for path in event.paths {
                        if !is_temp_file(&path) {
                            debouncer.record(path, kind);
                        }
                    }
                }
                _ = sleep_until(next_deadline) => {
                    for change in debouncer.drain_ready() {
                        route_change(&root, &router, &senders, &change.path);
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watchers,
        watched,
    })
}

fn watch_dir(dir: &Path, event_tx: mpsc::UnboundedSender<Event>) -> Result<RecommendedWatcher> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory");
    }

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away on shutdown.
                let _ = event_tx.send(event);
            }
            Err(err) => warn!("file watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    Ok(watcher)
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Send `path` to every category whose patterns match it.
pub fn route_change(
    root: &Path,
    router: &WatchRouter,
    senders: &HashMap<TaskKind, mpsc::UnboundedSender<PathBuf>>,
    path: &Path,
) {
    let Some(rel) = relative_str(root, path) else {
        debug!(?path, "change outside project root; ignoring");
        return;
    };

    let kinds = router.route(&rel);
    if kinds.is_empty() {
        debug!(path = %rel, "change matches no watch pattern; ignoring");
        return;
    }

    for kind in kinds {
        if let Some(tx) = senders.get(&kind) {
            debug!(path = %rel, task = %kind, "routing change");
            if tx.send(PathBuf::from(&rel)).is_err() {
                warn!(task = %kind, "rebuild loop is gone; dropping change");
            }
        }
    }
}

/// `dir` (relative to `root`) if it exists, otherwise its closest existing
/// ancestor; `.` when nothing below `root` exists.
fn nearest_existing(root: &Path, dir: &Path) -> PathBuf {
    let mut candidate = dir.to_path_buf();
    while !candidate.as_os_str().is_empty() && candidate != Path::new(".") {
        if root.join(&candidate).is_dir() {
            return candidate;
        }
        candidate.pop();
    }
    PathBuf::from(".")
}

/// Drop directories nested inside another directory in the list.
fn outermost(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.sort();
    let mut out: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        let covered = out
            .iter()
            .any(|kept| kept == Path::new(".") || dir.starts_with(kept));
        if !covered {
            out.push(dir);
        }
    }
    out
}
