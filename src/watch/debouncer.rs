// src/watch/debouncer.rs

//! Per-path event debouncing.
//!
//! Editors often emit several events for one save (truncate, write, chmod,
//! rename). Each path gets a deadline that moves forward on every event; the
//! path is released once its deadline passes with no further events.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::EventKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    /// Map a notify event kind; `None` for events that never change content.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            _ => None,
        }
    }
}

/// A debounced change, ready to be routed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebouncedChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe event debouncer.
pub struct EventDebouncer {
    pending: Mutex<HashMap<PathBuf, Pending>>,
    quiet_period: Duration,
}

impl EventDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            quiet_period,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Pending>> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Record an event, pushing the path's deadline out by the quiet period.
    pub fn record(&self, path: PathBuf, kind: ChangeKind) {
        self.record_at(path, kind, Instant::now());
    }

    fn record_at(&self, path: PathBuf, kind: ChangeKind, now: Instant) {
        let deadline = now + self.quiet_period;
        let mut pending = self.lock();

        match pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut entry) => match coalesce(entry.get().kind, kind) {
                Some(kind) => {
                    *entry.get_mut() = Pending { kind, deadline };
                }
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Remove and return every change whose deadline has passed.
    pub fn drain_ready(&self) -> Vec<DebouncedChange> {
        self.drain_ready_at(Instant::now())
    }

    fn drain_ready_at(&self, now: Instant) -> Vec<DebouncedChange> {
        let mut pending = self.lock();
        let ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut changes: Vec<DebouncedChange> = ready
            .into_iter()
            .filter_map(|path| {
                let entry = pending.remove(&path)?;
                Some(DebouncedChange {
                    path,
                    kind: entry.kind,
                })
            })
            .collect();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }

    /// Earliest pending deadline, for timer scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock().values().map(|p| p.deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Combine two events for the same path; `None` discards both.
fn coalesce(existing: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::{Created, Modified, Removed};

    match (existing, new) {
        (Created, Removed) => None,
        (Created, _) => Some(Created),
        (Modified, Created) => Some(Created),
        (Modified, Modified) => Some(Modified),
        (Modified, Removed) => Some(Removed),
        (Removed, Created) => Some(Modified),
        (Removed, _) => Some(Removed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_only_after_quiet_period() {
        let debouncer = EventDebouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let path = PathBuf::from("src/pug/index.pug");

        debouncer.record_at(path.clone(), ChangeKind::Modified, t0);
        assert!(debouncer.drain_ready_at(t0 + Duration::from_millis(50)).is_empty());

        let ready = debouncer.drain_ready_at(t0 + Duration::from_millis(100));
        assert_eq!(
            ready,
            vec![DebouncedChange {
                path,
                kind: ChangeKind::Modified
            }]
        );
        assert!(debouncer.is_empty());
    }

    #[test]
    fn burst_extends_deadline_and_collapses() {
        let debouncer = EventDebouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let path = PathBuf::from("src/scss/style.scss");

        debouncer.record_at(path.clone(), ChangeKind::Modified, t0);
        debouncer.record_at(path.clone(), ChangeKind::Modified, t0 + Duration::from_millis(80));

        assert!(debouncer.drain_ready_at(t0 + Duration::from_millis(120)).is_empty());
        assert_eq!(debouncer.drain_ready_at(t0 + Duration::from_millis(180)).len(), 1);
    }

    #[test]
    fn created_then_removed_is_discarded() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let t0 = Instant::now();
        let path = PathBuf::from("src/img/tmp.jpg");

        debouncer.record_at(path.clone(), ChangeKind::Created, t0);
        debouncer.record_at(path, ChangeKind::Removed, t0);

        assert!(debouncer.is_empty());
        assert!(debouncer.next_deadline().is_none());
    }

    #[test]
    fn coalesce_rules() {
        use ChangeKind::{Created, Modified, Removed};

        assert_eq!(coalesce(Created, Modified), Some(Created));
        assert_eq!(coalesce(Modified, Removed), Some(Removed));
        assert_eq!(coalesce(Removed, Created), Some(Modified));
        assert_eq!(coalesce(Removed, Modified), Some(Removed));
    }
}
