// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pug;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::PipelineConfig;
use crate::config::loader::load_or_default;
use crate::engine::{run_initial_build, RebuildLoop, ReloadSink};
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::{DevServer, LiveReload, ServerOptions};
use crate::tasks::TaskSet;
use crate::types::TaskKind;
use crate::watch::{spawn_watcher, WatchRouter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the initial build (fatal on error)
/// - one rebuild loop per category
/// - the file watcher
/// - the dev server and browser launch
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let tasks = TaskSet::from_config(&cfg, fs)?;

    run_initial_build(&tasks).await?;

    if args.once {
        return Ok(());
    }

    let live_reload = LiveReload::new();
    let server = DevServer::bind(&ServerOptions::from_config(&cfg), live_reload.clone()).await?;
    let port = server.local_addr()?.port();

    let _watcher = start_watch_phase(&cfg, &tasks, Arc::new(live_reload))?;

    let open = args.open_mode(cfg.server().open);
    if let Some(url) = server::open::start_url(open, port, &cfg.server().start_path) {
        info!(%url, "opening browser");
        tokio::spawn(async move {
            if let Err(err) = server::open::open_browser(&url).await {
                warn!("could not open browser: {err:#}");
            }
        });
    }

    tokio::select! {
        served = server.serve() => served?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("interrupted; shutting down");
        }
    }

    Ok(())
}

/// Spawn a rebuild loop per category and the watcher feeding them.
///
/// The returned handle keeps the watcher alive; dropping it closes every
/// category channel and lets the loops exit.
pub fn start_watch_phase(
    cfg: &PipelineConfig,
    tasks: &TaskSet,
    reloader: Arc<dyn ReloadSink>,
) -> Result<watch::WatcherHandle> {
    let mut senders = HashMap::new();

    for kind in TaskKind::ALL {
        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();
        senders.insert(kind, tx);

        let rebuild_loop = RebuildLoop::new(tasks.get(kind), rx, Arc::clone(&reloader));
        tokio::spawn(async move {
            if let Err(err) = rebuild_loop.run().await {
                warn!(task = %kind, "rebuild loop stopped: {err}");
            }
        });
    }

    let router = WatchRouter::from_config(cfg)?;
    let debounce = Duration::from_millis(cfg.watch().debounce_ms);
    spawn_watcher(cfg.root().to_path_buf(), router, senders, debounce)
}
