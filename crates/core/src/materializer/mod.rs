//! The Materializer Protocol (§4.6): the contract a materializer implements to mirror
//! CRDT state into an external store, and push changes back through the Table API.
//!
//! Materializers never read from another materializer (§4.6); they read the CRDT
//! (through [`MaterializerContext::workspace`]) and write to their backing store, with
//! `push` as the sole exception: it reads the external store and writes back through
//! the Table API (an upsert per row).

mod errors;

pub use errors::MaterializerError;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::field::Value;
use crate::schema::WorkspaceSchema;
use crate::workspace::Workspace;

/// Everything a materializer factory needs to construct its instance (§4.6): the
/// workspace id, a read-only handle to the declared schema, a filesystem root for
/// backends that need one, and the workspace itself (for `pull`/`push` table access).
#[derive(Clone)]
pub struct MaterializerContext {
    pub workspace_id: String,
    pub schema: Arc<WorkspaceSchema>,
    pub root: PathBuf,
    pub workspace: Arc<Workspace>,
}

/// A component that mirrors CRDT state into an external store and can push changes
/// back (§4.6). Installed on the Observer Bus by [`crate::workspace::WorkspaceBuilder::materializer`]
/// for each table it declares in [`Materializer::tables`].
#[async_trait]
pub trait Materializer: Send + Sync {
    /// A stable name used in logs and failure-counter keys (§4.5, §7).
    fn name(&self) -> &str;

    /// The tables this materializer observes and mirrors.
    fn tables(&self) -> Vec<String>;

    /// A row was added to one of this materializer's tables.
    async fn on_add(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError>;

    /// A row in one of this materializer's tables changed.
    async fn on_update(&self, table: &str, id: &str, row: &HashMap<String, Value>) -> Result<(), MaterializerError>;

    /// A row was removed from one of this materializer's tables.
    async fn on_delete(&self, table: &str, id: &str) -> Result<(), MaterializerError>;

    /// Drain the CRDT into the external store, replacing any content for rows this
    /// materializer manages (§4.6 `pull_to_X`). Called once at workspace startup,
    /// before providers attach (§4.10, §5), and may be called again by a host.
    async fn pull(&self) -> Result<(), MaterializerError>;

    /// Read the external store and apply its contents back into the CRDT via the Table
    /// API — an upsert per row (§4.6 `push_from_X`). Deletion of CRDT rows no longer
    /// present in the store is optional and declared by the materializer.
    async fn push(&self) -> Result<(), MaterializerError>;

    /// Release any resources (connections, file watchers). Called on workspace
    /// shutdown, in reverse registration order (§3 lifecycle).
    async fn close(&self) -> Result<(), MaterializerError> {
        Ok(())
    }
}
