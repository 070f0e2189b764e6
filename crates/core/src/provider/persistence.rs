//! The persistence provider (§4.10): loads the last-known serialized CRDT from disk on
//! start, and snapshots the full document back to disk after every commit.
//!
//! Chosen over an append-style log (the spec leaves the choice to the implementer):
//! a full-document snapshot keeps recovery time bounded by the document's current size
//! rather than its edit history, at the cost of rewriting the whole file on every
//! commit — acceptable for the local-first, single-writer-per-replica workloads this
//! runtime targets (see DESIGN.md).

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::errors::ProviderError;
use super::{Provider, ProviderContext};

/// Snapshot-to-disk persistence for one workspace's CRDT document.
pub struct PersistenceProvider {
    path: Mutex<Option<PathBuf>>,
}

impl Default for PersistenceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceProvider {
    pub fn new() -> Self {
        Self {
            path: Mutex::new(None),
        }
    }

    fn err(&self, reason: impl std::fmt::Display, source: Option<std::io::Error>) -> ProviderError {
        match source {
            Some(source) => ProviderError::Io {
                provider: self.name().to_string(),
                source,
            },
            None => ProviderError::StartFailed {
                provider: self.name().to_string(),
                reason: reason.to_string(),
            },
        }
    }
}

#[async_trait]
impl Provider for PersistenceProvider {
    fn name(&self) -> &str {
        "persistence"
    }

    async fn start(&self, ctx: &ProviderContext) -> Result<(), ProviderError> {
        let dir = ctx.root.join(&ctx.workspace_id);
        fs::create_dir_all(&dir).await.map_err(|e| self.err("", Some(e)))?;
        let snapshot_path = dir.join("snapshot.json");
        if let Ok(bytes) = fs::read(&snapshot_path).await {
            ctx.workspace
                .apply_remote_update(&bytes)
                .await
                .map_err(|e| self.err(e, None))?;
        }
        *self.path.lock().await = Some(snapshot_path);
        Ok(())
    }

    async fn on_commit(&self, bytes: &[u8]) -> Result<(), ProviderError> {
        let guard = self.path.lock().await;
        let Some(path) = guard.as_ref() else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).await.map_err(|e| self.err("", Some(e)))?;
        file.write_all(bytes).await.map_err(|e| self.err("", Some(e)))?;
        file.flush().await.map_err(|e| self.err("", Some(e)))?;
        drop(file);
        fs::rename(&tmp, path).await.map_err(|e| self.err("", Some(e)))?;
        Ok(())
    }
}
