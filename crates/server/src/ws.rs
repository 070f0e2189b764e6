//! `WS /sync/<workspace-id>` (§4.12, §6): bidirectional CRDT byte stream. Handshake:
//! the server sends its current document snapshot as the first binary frame; the
//! client sends whatever updates it is missing; thereafter both sides forward new
//! updates as they are produced (§6's sync-frame contract).
//!
//! Remote updates are admitted through [`epicenter_core::workspace::Workspace::apply_remote_update`],
//! which runs the Observer Bus's normal dispatch path, so materializers react to a
//! peer's writes exactly as they would to a local one (§4.12).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::AppState;

pub async fn sync(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    ws: WebSocketUpgrade,
) -> axum::response::Response {
    let Some(workspace) = state.epicenter.workspace(&workspace_id).cloned() else {
        return (axum::http::StatusCode::NOT_FOUND, "unknown workspace").into_response();
    };
    let provider = state.sync_providers.get(&workspace_id).cloned();
    ws.on_upgrade(move |socket| handle_socket(socket, workspace, provider))
}

async fn handle_socket(
    mut socket: WebSocket,
    workspace: Arc<epicenter_core::Workspace>,
    provider: Option<Arc<crate::sync::BroadcastSyncProvider>>,
) {
    if socket.send(Message::Binary(workspace.snapshot().into())).await.is_err() {
        return;
    }

    let mut updates = provider.as_ref().map(|p| p.subscribe());

    loop {
        let incoming = match &mut updates {
            Some(rx) => tokio::select! {
                frame = socket.recv() => Either::Socket(frame),
                update = rx.recv() => Either::Broadcast(update),
            },
            None => Either::Socket(socket.recv().await),
        };

        match incoming {
            Either::Socket(Some(Ok(Message::Binary(bytes)))) => {
                if let Err(err) = workspace.apply_remote_update(&bytes).await {
                    tracing::warn!(workspace = workspace.id(), error = %err, "sync: rejected an incoming update");
                }
            }
            Either::Socket(Some(Ok(Message::Close(_)))) | Either::Socket(None) => break,
            Either::Socket(Some(Ok(_))) => {}
            Either::Socket(Some(Err(err))) => {
                tracing::warn!(workspace = workspace.id(), error = %err, "sync: socket error");
                break;
            }
            Either::Broadcast(Ok(bytes)) => {
                if socket.send(Message::Binary(bytes.into())).await.is_err() {
                    break;
                }
            }
            Either::Broadcast(Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped))) => {
                tracing::warn!(workspace = workspace.id(), skipped, "sync: client lagged, resending full snapshot");
                if socket.send(Message::Binary(workspace.snapshot().into())).await.is_err() {
                    break;
                }
            }
            Either::Broadcast(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {}
        }
    }
}

enum Either<A, B> {
    Socket(A),
    Broadcast(B),
}
