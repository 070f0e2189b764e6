//! The Table API (§4.4): a typed read/write handle bound to one table. All writes route
//! through the CRDT document; no write path touches a materializer directly (§3
//! invariant 4).

mod errors;
mod value;

pub use errors::TableError;
pub use value::{serialize_row, validate_row_projection, ValidatedRow, ValidatedValue};

use std::collections::HashMap;
use std::sync::Arc;

use crate::crdt::CrdtValue;
use crate::field::{FieldKind, Value};
use crate::observer::ObserverCallbacks;
use crate::workspace::Workspace;

/// The outcome of reading a single row (§4.4 `get`).
#[derive(Debug, Clone)]
pub enum RowStatus {
    Valid(HashMap<String, Value>),
    Invalid { reason: String },
    Absent,
}

/// A typed read/write handle bound to one declared table of a [`Workspace`].
///
/// Obtained via [`Workspace::table`]. Every write lands in the workspace's CRDT
/// document and is dispatched through the Observer Bus before this call returns
/// (§4.4, §4.5); no write path touches a materializer directly.
pub struct Table {
    workspace: Arc<Workspace>,
    name: String,
}

impl Table {
    pub(crate) fn new(workspace: Arc<Workspace>, name: impl Into<String>) -> Self {
        Self {
            workspace,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a complete row. Fails with `id-conflict` if the id already exists (§4.4).
    pub async fn insert(&self, row: HashMap<String, Value>) -> Result<(), TableError> {
        self.workspace.table_insert(&self.name, row).await
    }

    /// Insert or replace a complete row unconditionally (§4.4).
    pub async fn upsert(&self, row: HashMap<String, Value>) -> Result<(), TableError> {
        self.workspace.table_upsert(&self.name, row).await
    }

    /// Apply a partial update to an existing row; omitted fields are unchanged (§4.4).
    pub async fn update(&self, id: &str, patch: HashMap<String, Value>) -> Result<(), TableError> {
        self.workspace.table_update(&self.name, id, patch).await
    }

    /// Delete a row by id. Idempotent: deleting an absent id is not an error (§4.4).
    pub async fn delete(&self, id: &str) -> Result<(), TableError> {
        self.workspace.table_delete(&self.name, id).await
    }

    /// Delete every row in `ids`. Idempotent (§4.4).
    pub async fn delete_many(&self, ids: &[String]) -> Result<(), TableError> {
        self.workspace.table_delete_many(&self.name, ids).await
    }

    /// Read one row by id (§4.4).
    pub fn get(&self, id: &str) -> RowStatus {
        self.workspace.table_get(&self.name, id)
    }

    /// Every row in the table, valid or not, paired with its validation status (§4.4).
    pub fn get_all(&self) -> Vec<(String, RowStatus)> {
        self.workspace.table_get_all(&self.name)
    }

    /// Every *valid* row in the table, as the validated projection (§4.4, §3).
    pub fn get_all_valid(&self) -> Vec<ValidatedRow> {
        self.workspace.table_get_all_valid(&self.name)
    }

    /// Valid rows passing `predicate` (§4.4).
    pub fn filter(&self, predicate: impl Fn(&HashMap<String, Value>) -> bool) -> Vec<HashMap<String, Value>> {
        self.workspace
            .table_get_all_valid(&self.name)
            .into_iter()
            .map(|row| serialize_row(&row))
            .filter(|row| predicate(row))
            .collect()
    }

    /// Subscribe `callbacks` to this table's `add`/`update`/`delete` events (§4.4).
    /// Distinct from registering a [`crate::materializer::Materializer`]: this is the
    /// in-process notification path (e.g. a host wanting to react to a change), not a
    /// mirror into an external store. Returns an unsubscribe handle; dropping it leaves
    /// the subscription active — call [`TableSubscription::unsubscribe`] explicitly.
    pub fn observe(&self, callbacks: ObserverCallbacks) -> Result<TableSubscription, TableError> {
        let id = self.workspace.observe(&self.name, callbacks)?;
        Ok(TableSubscription {
            workspace: Arc::clone(&self.workspace),
            table: self.name.clone(),
            id,
        })
    }
}

/// An active [`Table::observe`] subscription. Call [`Self::unsubscribe`] to stop
/// receiving events; an unsubscribed handle has no further effect if called again.
pub struct TableSubscription {
    workspace: Arc<Workspace>,
    table: String,
    id: u64,
}

impl TableSubscription {
    pub fn unsubscribe(self) {
        self.workspace.unobserve(&self.table, self.id);
    }
}

/// Convert a complete serialized row to its CRDT field map, for writing (§4.3/§4.4).
pub(crate) fn row_to_crdt(row: &HashMap<String, Value>) -> HashMap<String, CrdtValue> {
    row.iter().map(|(k, v)| (k.clone(), CrdtValue::from(v))).collect()
}

/// Convert a CRDT row's field map back to a serialized row, given each field's
/// declared kind. Fields whose stored value doesn't match the declared kind (e.g. a
/// peer update that violated the schema) are simply omitted, which in turn makes the
/// row fail full validation (`missing-required` or similar) rather than panicking.
pub(crate) fn crdt_row_to_row(
    crdt_row: &HashMap<String, CrdtValue>,
    field_kinds: impl Iterator<Item = (String, FieldKind)>,
) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for (name, kind) in field_kinds {
        if let Some(value) = crdt_row.get(&name) {
            if let Some(v) = crdt_value_to_value(&kind, value) {
                out.insert(name, v);
            }
        }
    }
    out
}

fn crdt_value_to_value(kind: &FieldKind, value: &CrdtValue) -> Option<Value> {
    match (kind, value) {
        (FieldKind::Id, CrdtValue::Text(s)) => Some(Value::Id(s.clone())),
        (FieldKind::Text, CrdtValue::Text(s)) => Some(Value::Text(s.clone())),
        (FieldKind::Integer { .. }, CrdtValue::Integer(i)) => Some(Value::Integer(*i)),
        (FieldKind::Boolean, CrdtValue::Boolean(b)) => Some(Value::Boolean(*b)),
        (FieldKind::Date, CrdtValue::Text(s)) => crate::date::DateTimeTz::parse_canonical(s)
            .ok()
            .map(Value::Date),
        (FieldKind::Select { .. }, CrdtValue::Text(s)) => Some(Value::Select(s.clone())),
        (FieldKind::Tags { .. }, CrdtValue::Tags(t)) => Some(Value::Tags(t.clone())),
        (FieldKind::Json { .. }, CrdtValue::Json(j)) => Some(Value::Json(j.clone())),
        (FieldKind::RichText, CrdtValue::Text(s)) => Some(Value::RichText(s.clone())),
        _ => None,
    }
}
