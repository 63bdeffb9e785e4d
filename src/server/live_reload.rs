// src/server/live_reload.rs

//! Live-reload hub and WebSocket endpoint.
//!
//! Every connected page holds a WebSocket. On connect the server sends a
//! `hello` carrying this process's instance id; every successful rebuild
//! broadcasts a `reload`. A page that reconnects and sees a different instance
//! id knows the server restarted.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::engine::ReloadSink;
use crate::types::TaskKind;

use super::ServerState;

/// Message sent to connected pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Hello { instance: String },
    Reload,
}

/// Broadcasts reloads to every connected page.
#[derive(Clone, Debug)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadMessage>,
    instance: String,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self::with_instance(format!("{nanos:x}"))
    }

    pub fn with_instance(instance: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            instance: instance.into(),
        }
    }

    /// Identifies this server process.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn hello(&self) -> ReloadMessage {
        ReloadMessage::Hello {
            instance: self.instance.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Send a reload to every connected page; returns how many were listening.
    pub fn broadcast_reload(&self) -> usize {
        self.tx.send(ReloadMessage::Reload).unwrap_or(0)
    }
}

impl ReloadSink for LiveReload {
    fn reload(&self, kind: TaskKind) {
        let clients = self.broadcast_reload();
        info!(task = %kind, clients, "reloading browsers");
    }
}

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let live_reload = state.live_reload.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, live_reload))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, live_reload: LiveReload) {
    let mut receiver = live_reload.subscribe();

    if send(&mut socket, &live_reload.hello()).await.is_err() {
        return;
    }
    debug!(instance = live_reload.instance(), "live-reload client connected");

    loop {
        tokio::select! {
            // Forward reload events to client
            result = receiver.recv() => {
                match result {
                    Ok(message) => {
                        if send(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
            // Client messages are ignored; a closed socket ends the loop.
            result = socket.recv() => {
                match result {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    debug!("live-reload client disconnected");
}

async fn send(socket: &mut WebSocket, message: &ReloadMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}
