// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - Compiling the `watch` glob patterns of each category.
//! - Wiring up a cross-platform filesystem watcher (`notify`) per source
//!   directory.
//! - Debouncing bursts of events per path before acting on them.
//!
//! It does **not** run any build work; it only turns filesystem changes into
//! changed paths on the matching category's channel.

pub mod debouncer;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debouncer::{ChangeKind, DebouncedChange, EventDebouncer};
pub use patterns::{build_globset, WatchRegistration, WatchRouter};
pub use watcher::{route_change, spawn_watcher, WatcherHandle};
