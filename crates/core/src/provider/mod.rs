//! Provider lifecycle (§4.10): functions that attach external capabilities — persistence,
//! real-time sync — to a workspace's CRDT document.
//!
//! Providers are started *after* materializers have completed their initial pull
//! (§4.10, §5), so that the initial load fires normal `add` events into materializers
//! rather than racing a concurrent peer update.

mod errors;
mod persistence;

pub use errors::ProviderError;
pub use persistence::PersistenceProvider;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::workspace::Workspace;

/// Everything a provider needs to attach to a workspace (§4.10).
#[derive(Clone)]
pub struct ProviderContext {
    pub workspace_id: String,
    pub root: PathBuf,
    pub workspace: Arc<Workspace>,
}

/// A function that attaches an external capability to a workspace's CRDT document
/// (§4.10). Implementations apply incoming bytes through
/// [`Workspace::apply_remote_update`] so that remote changes run through the Observer
/// Bus's normal path, exactly like a local commit (§4.12).
#[async_trait]
pub trait Provider: Send + Sync {
    /// A stable name used in logs (§7).
    fn name(&self) -> &str;

    /// Attach to the workspace. For a persistence provider this loads the last known
    /// snapshot; for a sync provider this opens the transport and performs its
    /// handshake.
    async fn start(&self, ctx: &ProviderContext) -> Result<(), ProviderError>;

    /// Called after every local or remote commit, with the document's freshly
    /// serialized bytes — the persistence provider's hook to flush a snapshot, and the
    /// sync provider's hook to forward the update to its peer.
    async fn on_commit(&self, bytes: &[u8]) -> Result<(), ProviderError> {
        let _ = bytes;
        Ok(())
    }

    /// Release resources (open file handles, sockets). Called on workspace shutdown,
    /// in reverse registration order (§3 lifecycle).
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
