// src/server/mod.rs

//! Development HTTP server with live reload.
//!
//! - [`static_files`] serves `base_dir`, injecting the client script into HTML.
//! - [`live_reload`] owns the broadcast hub and the WebSocket endpoint.
//! - [`script`] holds the browser-side client.
//! - [`open`] launches a browser at the start page.

pub mod live_reload;
pub mod open;
pub mod script;
pub mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};

pub use live_reload::{LiveReload, ReloadMessage};

/// Settings for the dev server, taken from `[server]`.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub base_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub reload_on_restart: bool,
}

impl ServerOptions {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        let section = cfg.server();
        Self {
            base_dir: cfg.resolve(&section.base_dir),
            host: section.host.clone(),
            port: section.port,
            reload_on_restart: section.reload_on_restart,
        }
    }
}

/// Shared state for request handlers.
#[derive(Debug)]
pub(crate) struct ServerState {
    base_dir: PathBuf,
    live_reload: LiveReload,
    client_script: String,
}

/// Build the application router.
pub fn router(options: &ServerOptions, live_reload: LiveReload) -> Router {
    let state = Arc::new(ServerState {
        base_dir: options.base_dir.clone(),
        live_reload,
        client_script: script::client_script(options.reload_on_restart),
    });

    Router::new()
        .route(script::LIVE_RELOAD_PATH, get(live_reload::ws_handler))
        .route(script::LIVE_RELOAD_SCRIPT_PATH, get(client_script))
        .fallback(static_files::serve_file)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn client_script(
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        state.client_script.clone(),
    )
}

/// A bound, not yet serving, dev server.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    router: Router,
}

impl DevServer {
    /// Bind `host:port`. Port 0 picks a free port (see [`DevServer::local_addr`]).
    pub async fn bind(options: &ServerOptions, live_reload: LiveReload) -> Result<Self> {
        let addr = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| PipelineError::Server(format!("cannot bind {addr}: {e}")))?;

        Ok(Self {
            listener,
            router: router(options, live_reload),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process is interrupted or the listener fails.
    pub async fn serve(self) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("dev server listening on http://{addr}");
        }
        axum::serve(self.listener, self.router)
            .await
            .map_err(|e| PipelineError::Server(e.to_string()))
    }
}
