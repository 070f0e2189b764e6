//! The real-time sync provider (§4.10, §4.12): forwards every local or merged commit to
//! whatever WebSocket clients are currently attached to this workspace's `/sync/<id>`
//! endpoint, and lets the endpoint admit incoming bytes the same way.
//!
//! Grounded on [`epicenter_core::provider::PersistenceProvider`]'s shape (a `Provider`
//! whose `on_commit` hook does the interesting work) but broadcasts instead of writing
//! to disk, the way the teacher's sync transports forward outgoing updates to a peer.

use async_trait::async_trait;
use epicenter_core::provider::{Provider, ProviderContext, ProviderError};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Registered on a workspace alongside its other providers so that every commit —
/// local write or merged remote update — reaches every WebSocket client currently
/// subscribed to that workspace's sync endpoint (§4.9 "emit outgoing bytes on commit").
pub struct BroadcastSyncProvider {
    sender: broadcast::Sender<Vec<u8>>,
}

impl Default for BroadcastSyncProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastSyncProvider {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// A fresh receiver for a newly-connected sync client. Lagging receivers drop the
    /// oldest unread updates rather than blocking the broadcaster; a dropped update is
    /// recoverable because the client can always request a full snapshot again.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Provider for BroadcastSyncProvider {
    fn name(&self) -> &str {
        "sync-broadcast"
    }

    async fn start(&self, _ctx: &ProviderContext) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn on_commit(&self, bytes: &[u8]) -> Result<(), ProviderError> {
        // No receivers is the common case between connections; `send` returning an
        // error just means nobody is listening right now, not a failure to report.
        let _ = self.sender.send(bytes.to_vec());
        Ok(())
    }
}
