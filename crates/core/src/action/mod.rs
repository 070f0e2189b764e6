//! The Action System (§4.11): `defineQuery`/`defineMutation`, input validators, and the
//! wiring of actions into the client, CLI, and HTTP surfaces.

mod errors;

pub use errors::ActionError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

use crate::blob::BlobStore;
use crate::schema::WorkspaceSchema;
use crate::table::Table;
use crate::workspace::Workspace;

/// Whether an action reads or mutates workspace state (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Query,
    Mutation,
}

/// The set of named actions a dependency workspace exposes, handed to a dependent
/// workspace's [`ActionContext::workspaces`] (§4.11).
pub type ActionSet = HashMap<String, Arc<dyn Action>>;

/// A dependency workspace's actions, bundled with the fully-resolved [`ActionContext`]
/// those actions themselves expect (§4.11's `context.workspaces`).
///
/// Bundling the context alongside the action set (rather than handing back just the
/// actions) is what lets a handler actually *call* a dependency action end-to-end —
/// `invoke_json` needs a context of its own, and the Epicenter already built one while
/// wiring this workspace's dependencies in topological order (§3 invariant 6).
#[derive(Clone)]
pub struct DependencyHandle {
    actions: Arc<ActionSet>,
    context: ActionContext,
}

impl DependencyHandle {
    pub fn new(actions: Arc<ActionSet>, context: ActionContext) -> Self {
        Self { actions, context }
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(name)
    }

    /// The dependency's own context, for invoking one of [`Self::get`]'s actions.
    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    /// Invoke `name` on the dependency with its own context, the common case of
    /// calling through to a dependency's action (§4.11).
    pub async fn invoke(&self, name: &str, input: serde_json::Value) -> Result<serde_json::Value, ActionError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| ActionError::new("unknown-action", format!("no action named '{name}'")))?;
        action.invoke_json(input, self.context.clone()).await
    }
}

/// Everything an action handler needs (§4.11): table handles, the declared schema,
/// dependency workspaces' actions, blob namespaces, and the config root.
#[derive(Clone)]
pub struct ActionContext {
    workspace: Arc<Workspace>,
    schema: Arc<WorkspaceSchema>,
    dependencies: Arc<HashMap<String, DependencyHandle>>,
    blob_root: std::path::PathBuf,
    workspace_id: String,
}

impl ActionContext {
    pub fn new(
        workspace: Arc<Workspace>,
        schema: Arc<WorkspaceSchema>,
        dependencies: HashMap<String, DependencyHandle>,
        blob_root: std::path::PathBuf,
        workspace_id: String,
    ) -> Self {
        Self {
            workspace,
            schema,
            dependencies: Arc::new(dependencies),
            blob_root,
            workspace_id,
        }
    }

    pub fn table(&self, name: &str) -> Table {
        self.workspace.table(name)
    }

    pub fn schema(&self) -> &WorkspaceSchema {
        &self.schema
    }

    /// A dependency workspace's actions and context (§4.11's `context.workspaces`).
    pub fn dependency(&self, workspace_id: &str) -> Option<&DependencyHandle> {
        self.dependencies.get(workspace_id)
    }

    pub fn blobs(&self, table: &str) -> BlobStore {
        BlobStore::new(&self.blob_root, &self.workspace_id, table)
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }
}

/// A named query or mutation exposed by a workspace (§4.11).
#[async_trait]
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind;
    fn description(&self) -> Option<&str>;

    /// Invoke with a raw JSON input, returning a raw JSON output or a structured
    /// [`ActionError`] (§4.11, §4.12: this is exactly the shape the HTTP surface needs).
    async fn invoke_json(&self, input: Json, ctx: ActionContext) -> Result<Json, ActionError>;
}

struct TypedAction<In, Out, F> {
    kind: ActionKind,
    description: Option<String>,
    handler: F,
    _marker: std::marker::PhantomData<fn(In) -> Out>,
}

#[async_trait]
impl<In, Out, F, Fut> Action for TypedAction<In, Out, F>
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    F: Fn(In, ActionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Out, ActionError>> + Send + 'static,
{
    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    async fn invoke_json(&self, input: Json, ctx: ActionContext) -> Result<Json, ActionError> {
        let typed_input: In = serde_json::from_value(input)
            .map_err(|e| ActionError::validation_failed(format!("invalid input: {e}")))?;
        let output = (self.handler)(typed_input, ctx).await?;
        serde_json::to_value(output).map_err(|e| ActionError::new("internal-error", e.to_string()))
    }
}

fn boxed_handler<In, Out, F, Fut>(
    kind: ActionKind,
    description: Option<String>,
    handler: F,
) -> Arc<dyn Action>
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    F: Fn(In, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, ActionError>> + Send + 'static,
{
    Arc::new(TypedAction {
        kind,
        description,
        handler,
        _marker: std::marker::PhantomData,
    })
}

/// Declare a read-only action (§4.11).
pub fn define_query<In, Out, F, Fut>(description: impl Into<String>, handler: F) -> Arc<dyn Action>
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    F: Fn(In, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, ActionError>> + Send + 'static,
{
    boxed_handler(ActionKind::Query, Some(description.into()), handler)
}

/// Declare a mutating action (§4.11).
pub fn define_mutation<In, Out, F, Fut>(description: impl Into<String>, handler: F) -> Arc<dyn Action>
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    F: Fn(In, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, ActionError>> + Send + 'static,
{
    boxed_handler(ActionKind::Mutation, Some(description.into()), handler)
}
