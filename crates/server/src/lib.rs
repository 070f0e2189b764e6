//! The REST+WebSocket server surface (§4.12): exposes every workspace in an
//! [`epicenter_core::Epicenter`] as a health check, an OpenAPI document, a
//! `/workspaces/<id>/<action>` action-invocation surface, and a `/sync/<id>`
//! real-time CRDT WebSocket.
//!
//! Grounded on the teacher's HTTP sync transport (`sync/transports/http.rs`): a
//! `Router` built from a shared `State`, bound with `axum::serve` over a
//! `TcpListener`, the same way `HttpTransport::start_server` does it.

mod errors;
mod openapi;
mod routes;
pub mod sync;
mod ws;

pub use errors::ServerError;
pub use sync::BroadcastSyncProvider;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use epicenter_core::epicenter::{Client, Epicenter};

/// Shared handler state: the running [`Epicenter`] (for direct workspace access, used
/// by the sync endpoint) and the [`Client`] built from it (for action invocation).
pub struct AppState {
    epicenter: Arc<Epicenter>,
    client: Client,
    sync_providers: HashMap<String, Arc<BroadcastSyncProvider>>,
}

impl AppState {
    /// Build the shared state. `sync_providers` should contain the
    /// [`BroadcastSyncProvider`] registered on each workspace that wants a `/sync/<id>`
    /// endpoint (a workspace with no entry here still serves its actions, just not
    /// live sync).
    pub fn new(epicenter: Arc<Epicenter>, sync_providers: HashMap<String, Arc<BroadcastSyncProvider>>) -> Self {
        let client = epicenter.client();
        Self {
            epicenter,
            client,
            sync_providers,
        }
    }
}

/// Build the router (§4.12's four endpoint groups).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::health))
        .route("/openapi", get(routes::get_openapi))
        .route(
            "/workspaces/{workspace_id}/{action}",
            get(routes::invoke_get).post(routes::invoke_post),
        )
        .route("/sync/{workspace_id}", get(ws::sync))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve `router(state)` at `addr` until the process is signaled to stop
/// (mirrors the teacher's `axum::serve` + `TcpListener` startup sequence).
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "epicenter server listening");
    axum::serve(listener, app).await
}
