//! The [`Workspace`]: ties a declared [`WorkspaceSchema`] to a live [`CrdtDocument`],
//! the Observer Bus, a set of registered materializers, and a set of registered
//! providers into one runnable unit (§3, §4).
//!
//! Every write crosses exactly one place — [`Workspace`]'s `table_*` methods — so the
//! invariant "no write path touches a materializer directly" (§3) holds by construction:
//! materializers only ever hear about a change through [`crate::observer::ObserverBus::dispatch`].

mod errors;

pub use errors::WorkspaceError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::crdt::{CrdtDocument, RowDelta, RowDeltaKind, RowSnapshot};
use crate::field::{FieldKind, Value};
use crate::materializer::{Materializer, MaterializerContext};
use crate::observer::{FailureCounters, ObserverBus, ObserverCallbacks, RowEvent};
use crate::provider::{Provider, ProviderContext};
use crate::schema::{TableSchema, WorkspaceSchema};
use crate::table::{crdt_row_to_row, row_to_crdt, validate_row_projection, RowStatus, Table, TableError, ValidatedRow};

/// A declared, running workspace: one CRDT document, its schema, and everything wired
/// to observe and persist it.
///
/// Constructed via [`Workspace::builder`]; `Arc`-wrapped so that [`Table`] handles,
/// materializers, and providers can all hold a reference back to it (§4.4, §4.6, §4.10).
pub struct Workspace {
    id: String,
    root: PathBuf,
    schema: Arc<WorkspaceSchema>,
    doc: RwLock<CrdtDocument>,
    bus: ObserverBus,
    materializers: RwLock<Vec<Arc<dyn Materializer>>>,
    providers: RwLock<Vec<Arc<dyn Provider>>>,
}

type MaterializerFactory = Box<dyn FnOnce(MaterializerContext) -> Arc<dyn Materializer>>;

/// Builder for a [`Workspace`] (§3's construction step).
pub struct WorkspaceBuilder {
    id: String,
    root: PathBuf,
    schema: Arc<WorkspaceSchema>,
    materializer_factories: Vec<MaterializerFactory>,
    providers: Vec<Arc<dyn Provider>>,
}

impl Workspace {
    pub fn builder(id: impl Into<String>, root: impl AsRef<Path>, schema: WorkspaceSchema) -> WorkspaceBuilder {
        WorkspaceBuilder {
            id: id.into(),
            root: root.as_ref().to_path_buf(),
            schema: Arc::new(schema),
            materializer_factories: Vec::new(),
            providers: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &WorkspaceSchema {
        &self.schema
    }

    /// A cheap `Arc` clone of the declared schema, for callers (e.g. the Epicenter)
    /// building an [`crate::action::ActionContext`] that needs to own a handle to it.
    pub fn schema_arc(&self) -> Arc<WorkspaceSchema> {
        Arc::clone(&self.schema)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A typed read/write handle bound to `name` (§4.4).
    pub fn table(self: &Arc<Self>, name: &str) -> Table {
        Table::new(Arc::clone(self), name)
    }

    fn table_schema(&self, table: &str) -> Result<&TableSchema, TableError> {
        self.schema.table(table).ok_or_else(|| TableError::UnknownTable {
            table: table.to_string(),
        })
    }

    fn field_kinds(table_schema: &TableSchema) -> Vec<(String, FieldKind)> {
        table_schema
            .fields()
            .iter()
            .map(|(name, descriptor)| (name.clone(), descriptor.kind().clone()))
            .collect()
    }

    pub(crate) async fn table_insert(&self, table: &str, row: HashMap<String, Value>) -> Result<(), TableError> {
        let table_schema = self.table_schema(table)?;
        check_id_nonempty(table, &row)?;
        let completed = table_schema
            .validate_full(&row)
            .map_err(|errors| TableError::ValidationFailed {
                table: table.to_string(),
                errors,
            })?;
        let id = extract_id(table, &completed)?;

        let (deltas, bytes) = {
            let mut doc = self.doc.write().unwrap();
            if doc.get_row(table, &id).is_some() {
                return Err(TableError::IdConflict {
                    table: table.to_string(),
                    id,
                });
            }
            let mut txn = doc.begin();
            txn.put_row(table, &id, row_to_crdt(&completed));
            let deltas = txn.commit();
            let bytes = doc.to_bytes().unwrap_or_default();
            (deltas, bytes)
        };
        self.after_commit(deltas, bytes).await;
        Ok(())
    }

    pub(crate) async fn table_upsert(&self, table: &str, row: HashMap<String, Value>) -> Result<(), TableError> {
        let table_schema = self.table_schema(table)?;
        check_id_nonempty(table, &row)?;
        let completed = table_schema
            .validate_full(&row)
            .map_err(|errors| TableError::ValidationFailed {
                table: table.to_string(),
                errors,
            })?;
        let id = extract_id(table, &completed)?;

        let (deltas, bytes) = {
            let mut doc = self.doc.write().unwrap();
            let mut txn = doc.begin();
            txn.put_row(table, &id, row_to_crdt(&completed));
            let deltas = txn.commit();
            let bytes = doc.to_bytes().unwrap_or_default();
            (deltas, bytes)
        };
        self.after_commit(deltas, bytes).await;
        Ok(())
    }

    pub(crate) async fn table_update(
        &self,
        table: &str,
        id: &str,
        patch: HashMap<String, Value>,
    ) -> Result<(), TableError> {
        let table_schema = self.table_schema(table)?;
        let completed = table_schema
            .validate_partial(&patch)
            .map_err(|errors| TableError::ValidationFailed {
                table: table.to_string(),
                errors,
            })?;

        let (deltas, bytes) = {
            let mut doc = self.doc.write().unwrap();
            if doc.get_row(table, id).is_none() {
                return Err(TableError::RowNotFound {
                    table: table.to_string(),
                    id: id.to_string(),
                });
            }
            let mut txn = doc.begin();
            txn.patch_row(table, id, row_to_crdt(&completed));
            let deltas = txn.commit();
            let bytes = doc.to_bytes().unwrap_or_default();
            (deltas, bytes)
        };
        self.after_commit(deltas, bytes).await;
        Ok(())
    }

    pub(crate) async fn table_delete(&self, table: &str, id: &str) -> Result<(), TableError> {
        self.table_schema(table)?;
        let (deltas, bytes) = {
            let mut doc = self.doc.write().unwrap();
            let mut txn = doc.begin();
            txn.delete_row(table, id);
            let deltas = txn.commit();
            let bytes = doc.to_bytes().unwrap_or_default();
            (deltas, bytes)
        };
        self.after_commit(deltas, bytes).await;
        Ok(())
    }

    pub(crate) async fn table_delete_many(&self, table: &str, ids: &[String]) -> Result<(), TableError> {
        self.table_schema(table)?;
        let (deltas, bytes) = {
            let mut doc = self.doc.write().unwrap();
            let mut txn = doc.begin();
            for id in ids {
                txn.delete_row(table, id);
            }
            let deltas = txn.commit();
            let bytes = doc.to_bytes().unwrap_or_default();
            (deltas, bytes)
        };
        self.after_commit(deltas, bytes).await;
        Ok(())
    }

    pub(crate) fn table_get(&self, table: &str, id: &str) -> RowStatus {
        let Some(table_schema) = self.schema.table(table) else {
            return RowStatus::Absent;
        };
        let doc = self.doc.read().unwrap();
        match doc.get_row(table, id) {
            Some(row) => row_status_from_crdt(table_schema, &row),
            None => RowStatus::Absent,
        }
    }

    pub(crate) fn table_get_all(&self, table: &str) -> Vec<(String, RowStatus)> {
        let Some(table_schema) = self.schema.table(table) else {
            return Vec::new();
        };
        let doc = self.doc.read().unwrap();
        doc.table_row_ids(table)
            .into_iter()
            .map(|id| {
                let status = match doc.get_row(table, &id) {
                    Some(row) => row_status_from_crdt(table_schema, &row),
                    None => RowStatus::Absent,
                };
                (id, status)
            })
            .collect()
    }

    pub(crate) fn table_get_all_valid(&self, table: &str) -> Vec<ValidatedRow> {
        self.table_get_all(table)
            .into_iter()
            .filter_map(|(_, status)| match status {
                RowStatus::Valid(row) => Some(validate_row_projection(&row)),
                _ => None,
            })
            .collect()
    }

    /// Admit a peer's or persisted snapshot's CRDT bytes, merging them and dispatching
    /// the resulting deltas exactly like a local commit (§4.3, §4.10, §4.12).
    pub async fn apply_remote_update(&self, bytes: &[u8]) -> Result<(), crate::Error> {
        let (deltas, fresh_bytes) = {
            let mut doc = self.doc.write().unwrap();
            let deltas = doc.apply_update(bytes)?;
            let fresh_bytes = doc.to_bytes().unwrap_or_default();
            (deltas, fresh_bytes)
        };
        self.after_commit(deltas, fresh_bytes).await;
        Ok(())
    }

    /// The document's current serialized bytes (for a provider attaching mid-run, or a
    /// host wanting a manual snapshot).
    pub fn snapshot(&self) -> Vec<u8> {
        self.doc.read().unwrap().to_bytes().unwrap_or_default()
    }

    fn deltas_to_events(&self, deltas: Vec<RowDelta>) -> Vec<RowEvent> {
        let mut events = Vec::with_capacity(deltas.len());
        for delta in deltas {
            let Some(table_schema) = self.schema.table(&delta.table) else {
                continue;
            };
            let kinds = Self::field_kinds(table_schema);
            match delta.kind {
                RowDeltaKind::Added(snapshot) => events.push(RowEvent::Add {
                    row: crdt_row_to_row(&snapshot, kinds.into_iter()),
                    table: delta.table,
                    id: delta.id,
                }),
                RowDeltaKind::Updated(snapshot) => events.push(RowEvent::Update {
                    row: crdt_row_to_row(&snapshot, kinds.into_iter()),
                    table: delta.table,
                    id: delta.id,
                }),
                RowDeltaKind::Deleted => events.push(RowEvent::Delete {
                    table: delta.table,
                    id: delta.id,
                }),
            }
        }
        events
    }

    async fn after_commit(&self, deltas: Vec<RowDelta>, bytes: Vec<u8>) {
        let events = self.deltas_to_events(deltas);
        if !events.is_empty() {
            self.bus.dispatch(events).await;
        }
        let providers: Vec<Arc<dyn Provider>> = self.providers.read().unwrap().clone();
        for provider in providers {
            if let Err(err) = provider.on_commit(&bytes).await {
                tracing::warn!(provider = provider.name(), error = %err, "provider on_commit failed");
            }
        }
    }

    /// Bring up every registered materializer (initial `pull`) and then every
    /// registered provider (`start`), in registration order (§3, §4.10, §5: providers
    /// attach only after the initial materializer pull completes).
    pub async fn start(self: &Arc<Self>) -> Result<(), WorkspaceError> {
        let materializers: Vec<Arc<dyn Materializer>> = self.materializers.read().unwrap().clone();
        for materializer in &materializers {
            materializer
                .pull()
                .await
                .map_err(|source| WorkspaceError::InitialPullFailed {
                    materializer: materializer.name().to_string(),
                    source,
                })?;
        }

        let providers: Vec<Arc<dyn Provider>> = self.providers.read().unwrap().clone();
        for provider in &providers {
            let ctx = ProviderContext {
                workspace_id: self.id.clone(),
                root: self.root.clone(),
                workspace: Arc::clone(self),
            };
            provider
                .start(&ctx)
                .await
                .map_err(|source| WorkspaceError::ProviderStartFailed {
                    provider: provider.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Release every provider, then every materializer, in reverse registration order
    /// (§3 lifecycle). The CRDT document itself needs no explicit close: it is plain
    /// in-memory state, dropped with the `Workspace`.
    pub async fn shutdown(&self) {
        let providers: Vec<Arc<dyn Provider>> = self.providers.read().unwrap().clone();
        for provider in providers.iter().rev() {
            if let Err(err) = provider.stop().await {
                tracing::warn!(provider = provider.name(), error = %err, "provider stop failed");
            }
        }
        let materializers: Vec<Arc<dyn Materializer>> = self.materializers.read().unwrap().clone();
        for materializer in materializers.iter().rev() {
            if let Err(err) = materializer.close().await {
                tracing::warn!(materializer = materializer.name(), error = %err, "materializer close failed");
            }
        }
    }

    pub fn failure_counters(&self) -> Arc<FailureCounters> {
        self.bus.failure_counters()
    }

    /// Register ad-hoc `on_add`/`on_update`/`on_delete` callbacks on `table` (§4.4
    /// `Table::observe`), returning an opaque id for [`Self::unobserve`].
    pub(crate) fn observe(&self, table: &str, callbacks: ObserverCallbacks) -> Result<u64, TableError> {
        self.table_schema(table)?;
        Ok(self.bus.register_callback(table, callbacks))
    }

    /// Undo a prior [`Self::observe`] (§4.4: `observe` returns an unsubscribe handle).
    pub(crate) fn unobserve(&self, table: &str, id: u64) {
        self.bus.unregister_callback(table, id);
    }

    pub fn blobs(&self, table: &str) -> crate::blob::BlobStore {
        crate::blob::BlobStore::new(&self.root, &self.id, table)
    }
}

impl WorkspaceBuilder {
    /// Register a materializer factory, resolved once the workspace's `Arc` exists so
    /// the materializer's [`MaterializerContext`] can hold a real handle back to it
    /// (§4.6). Registration order is dispatch and shutdown order.
    pub fn materializer(
        mut self,
        factory: impl FnOnce(MaterializerContext) -> Arc<dyn Materializer> + 'static,
    ) -> Self {
        self.materializer_factories.push(Box::new(factory));
        self
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Arc<Workspace> {
        let workspace = Arc::new(Workspace {
            id: self.id,
            root: self.root,
            schema: self.schema,
            doc: RwLock::new(CrdtDocument::new()),
            bus: ObserverBus::new(),
            materializers: RwLock::new(Vec::new()),
            providers: RwLock::new(self.providers),
        });

        let mut materializers = Vec::with_capacity(self.materializer_factories.len());
        for factory in self.materializer_factories {
            let ctx = MaterializerContext {
                workspace_id: workspace.id.clone(),
                schema: Arc::clone(&workspace.schema),
                root: workspace.root.clone(),
                workspace: Arc::clone(&workspace),
            };
            let materializer = factory(ctx);
            for table in materializer.tables() {
                workspace.bus.register(&table, Arc::clone(&materializer));
            }
            materializers.push(materializer);
        }
        *workspace.materializers.write().unwrap() = materializers;
        workspace
    }
}

fn check_id_nonempty(table: &str, row: &HashMap<String, Value>) -> Result<(), TableError> {
    if let Some(Value::Id(id)) = row.get("id") {
        if !crate::id::is_valid(id) {
            return Err(TableError::BadId {
                table: table.to_string(),
            });
        }
    }
    Ok(())
}

fn extract_id(table: &str, completed: &HashMap<String, Value>) -> Result<String, TableError> {
    match completed.get("id") {
        Some(Value::Id(id)) if crate::id::is_valid(id) => Ok(id.clone()),
        _ => Err(TableError::BadId {
            table: table.to_string(),
        }),
    }
}

fn row_status_from_crdt(table_schema: &TableSchema, crdt_row: &RowSnapshot) -> RowStatus {
    let kinds = Workspace::field_kinds(table_schema);
    let row = crdt_row_to_row(crdt_row, kinds.into_iter());
    match table_schema.validate_full(&row) {
        Ok(completed) => RowStatus::Valid(completed),
        Err(errors) => RowStatus::Invalid {
            reason: format!("{errors:?}"),
        },
    }
}
