//! The authoritative CRDT document (§4.3): one sub-map per table (row-id -> row-map),
//! plus a kv sub-map, hosted as a [`Node`] tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::CrdtError;
use super::node::Node;
use super::value::CrdtValue;

const TABLES_KEY: &str = "tables";
const KV_KEY: &str = "kv";

/// A row's field map as seen by an observer: `field name -> value`, post-commit.
pub type RowSnapshot = HashMap<String, CrdtValue>;

/// One coalesced per-row change, produced by [`Transaction::commit`] or
/// [`CrdtDocument::apply_update`] (§4.3's transactional-coalescing rule, §4.5).
#[derive(Debug, Clone)]
pub struct RowDelta {
    pub table: String,
    pub id: String,
    pub kind: RowDeltaKind,
}

#[derive(Debug, Clone)]
pub enum RowDeltaKind {
    Added(RowSnapshot),
    Updated(RowSnapshot),
    Deleted,
}

/// The authoritative replicated state for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrdtDocument {
    root: Node,
    clock: u64,
}

impl Default for CrdtDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CrdtDocument {
    pub fn new() -> Self {
        Self {
            root: Node::new(),
            clock: 0,
        }
    }

    /// Begin a transaction: a contiguous set of mutations delivered to observers as one
    /// commit (§4.3). All mutations made through the returned [`Transaction`] share the
    /// same logical clock tick, so a row touched twice is diffed once against its
    /// pre-transaction state.
    pub fn begin(&mut self) -> Transaction<'_> {
        self.clock += 1;
        Transaction {
            doc: self,
            pre: HashMap::new(),
            touched_order: Vec::new(),
        }
    }

    pub fn get_row(&self, table: &str, id: &str) -> Option<RowSnapshot> {
        self.row_node(table, id).map(super::value::node_to_field_map)
    }

    pub fn table_row_ids(&self, table: &str) -> Vec<String> {
        match self.table_node(table) {
            Some(n) => n.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn get_kv(&self, key: &str) -> Option<CrdtValue> {
        self.root.get(KV_KEY)?.as_node()?.get(key).cloned()
    }

    fn table_node(&self, table: &str) -> Option<&Node> {
        self.root.get(TABLES_KEY)?.as_node()?.get(table)?.as_node()
    }

    fn row_node(&self, table: &str, id: &str) -> Option<&Node> {
        self.table_node(table)?.get(id)?.as_node()
    }

    /// Serialize the full document to bytes (for persistence and sync, §4.10/§6).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CrdtError> {
        serde_json::to_vec(self).map_err(|e| CrdtError::EncodeFailed {
            reason: e.to_string(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CrdtError> {
        serde_json::from_slice(bytes).map_err(|e| CrdtError::DecodeFailed {
            reason: e.to_string(),
        })
    }

    /// Merge bytes from a peer or persisted snapshot into this document, atomically
    /// (§4.3: "CRDT merges never fail"; invariant violations surface later as a
    /// validation-invalid row rather than a merge error).
    ///
    /// Returns the set of row deltas the merge produced, across every table, so the
    /// caller (the Observer Bus) can dispatch them exactly like a local commit.
    pub fn apply_update(&mut self, bytes: &[u8]) -> Result<Vec<RowDelta>, CrdtError> {
        let incoming = Self::from_bytes(bytes)?;
        let before = self.snapshot_all_rows();
        self.root = self.root.merge(&incoming.root);
        self.clock = self.clock.max(incoming.clock) + 1;
        let after = self.snapshot_all_rows();
        Ok(diff_snapshots(&before, &after))
    }

    fn snapshot_all_rows(&self) -> HashMap<(String, String), RowSnapshot> {
        let mut out = HashMap::new();
        if let Some(tables) = self.root.get(TABLES_KEY).and_then(CrdtValue::as_node) {
            for (table, _) in tables.iter() {
                for id in self.table_row_ids(table) {
                    if let Some(row) = self.get_row(table, &id) {
                        out.insert((table.clone(), id), row);
                    }
                }
            }
        }
        out
    }
}

fn diff_snapshots(
    before: &HashMap<(String, String), RowSnapshot>,
    after: &HashMap<(String, String), RowSnapshot>,
) -> Vec<RowDelta> {
    let mut deltas = Vec::new();
    for (key, after_row) in after.iter() {
        match before.get(key) {
            None => deltas.push(RowDelta {
                table: key.0.clone(),
                id: key.1.clone(),
                kind: RowDeltaKind::Added(after_row.clone()),
            }),
            Some(before_row) if before_row != after_row => deltas.push(RowDelta {
                table: key.0.clone(),
                id: key.1.clone(),
                kind: RowDeltaKind::Updated(after_row.clone()),
            }),
            _ => {}
        }
    }
    for key in before.keys() {
        if !after.contains_key(key) {
            deltas.push(RowDelta {
                table: key.0.clone(),
                id: key.1.clone(),
                kind: RowDeltaKind::Deleted,
            });
        }
    }
    deltas
}

/// A contiguous set of mutations applied to a [`CrdtDocument`], delivered to observers
/// as a single commit once [`Transaction::commit`] is called (§4.3).
pub struct Transaction<'d> {
    doc: &'d mut CrdtDocument,
    pre: HashMap<(String, String), Option<RowSnapshot>>,
    touched_order: Vec<(String, String)>,
}

impl<'d> Transaction<'d> {
    fn capture_pre(&mut self, table: &str, id: &str) {
        let key = (table.to_string(), id.to_string());
        if !self.pre.contains_key(&key) {
            let pre = self.doc.get_row(table, id);
            self.pre.insert(key.clone(), pre);
            self.touched_order.push(key);
        }
    }

    /// Read the current (in-progress) state of a row, including this transaction's own
    /// not-yet-committed writes.
    pub fn get_row(&self, table: &str, id: &str) -> Option<RowSnapshot> {
        self.doc.get_row(table, id)
    }

    /// Replace a row's full field map (used by `insert`/`upsert`; existence checks are
    /// the Table API's responsibility, §4.4).
    pub fn put_row(&mut self, table: &str, id: &str, fields: RowSnapshot) {
        self.capture_pre(table, id);
        let clock = self.doc.clock;
        let table_node = self
            .doc
            .root
            .entry_or_insert_node(TABLES_KEY, clock)
            .entry_or_insert_node(table, clock);
        let row_node = table_node.entry_or_insert_node(id, clock);
        *row_node = Node::new();
        for (field, value) in fields {
            row_node.set(field, value, clock);
        }
    }

    /// Apply a partial update: only the given fields change; the rest of the row is
    /// left as-is (§4.4 `update`).
    pub fn patch_row(&mut self, table: &str, id: &str, fields: RowSnapshot) {
        self.capture_pre(table, id);
        let clock = self.doc.clock;
        let table_node = self
            .doc
            .root
            .entry_or_insert_node(TABLES_KEY, clock)
            .entry_or_insert_node(table, clock);
        let row_node = table_node.entry_or_insert_node(id, clock);
        for (field, value) in fields {
            row_node.set(field, value, clock);
        }
    }

    /// Tombstone a row (§4.4 `delete`/`deleteMany`; idempotent if already absent).
    pub fn delete_row(&mut self, table: &str, id: &str) {
        self.capture_pre(table, id);
        let clock = self.doc.clock;
        let table_node = self
            .doc
            .root
            .entry_or_insert_node(TABLES_KEY, clock)
            .entry_or_insert_node(table, clock);
        table_node.remove(id, clock);
    }

    pub fn set_kv(&mut self, key: &str, value: CrdtValue) {
        let clock = self.doc.clock;
        self.doc.root.entry_or_insert_node(KV_KEY, clock).set(key, value, clock);
    }

    pub fn get_kv(&self, key: &str) -> Option<CrdtValue> {
        self.doc.get_kv(key)
    }

    /// Commit the transaction: observers see exactly one event per row touched, using
    /// the coalescing rule in §4.3 (insert-then-delete of the same id fires nothing;
    /// insert-then-multiple-updates fires one `add` with the final state).
    pub fn commit(self) -> Vec<RowDelta> {
        let mut deltas = Vec::new();
        for key @ (table, id) in &self.touched_order {
            let pre = self.pre.get(key).cloned().flatten();
            let post = self.doc.get_row(table, id);
            match (pre, post) {
                (None, None) => {}
                (None, Some(after)) => deltas.push(RowDelta {
                    table: table.clone(),
                    id: id.clone(),
                    kind: RowDeltaKind::Added(after),
                }),
                (Some(_), None) => deltas.push(RowDelta {
                    table: table.clone(),
                    id: id.clone(),
                    kind: RowDeltaKind::Deleted,
                }),
                (Some(before), Some(after)) => {
                    if before != after {
                        deltas.push(RowDelta {
                            table: table.clone(),
                            id: id.clone(),
                            kind: RowDeltaKind::Updated(after),
                        });
                    }
                }
            }
        }
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(s: &str) -> CrdtValue {
        CrdtValue::Text(s.to_string())
    }

    #[test]
    fn insert_then_get_round_trips() {
        let mut doc = CrdtDocument::new();
        let mut txn = doc.begin();
        let mut row = RowSnapshot::new();
        row.insert("id".into(), field("n1"));
        row.insert("title".into(), field("Hello"));
        txn.put_row("notes", "n1", row);
        let deltas = txn.commit();
        assert_eq!(deltas.len(), 1);
        assert!(matches!(deltas[0].kind, RowDeltaKind::Added(_)));
        assert_eq!(doc.get_row("notes", "n1").unwrap().get("title"), Some(&field("Hello")));
    }

    #[test]
    fn insert_then_delete_in_one_transaction_fires_nothing() {
        let mut doc = CrdtDocument::new();
        let mut txn = doc.begin();
        let mut row = RowSnapshot::new();
        row.insert("id".into(), field("n1"));
        txn.put_row("notes", "n1", row);
        txn.delete_row("notes", "n1");
        let deltas = txn.commit();
        assert!(deltas.is_empty());
    }

    #[test]
    fn insert_then_multiple_updates_fires_one_add_with_final_state() {
        let mut doc = CrdtDocument::new();
        let mut txn = doc.begin();
        let mut row = RowSnapshot::new();
        row.insert("id".into(), field("n1"));
        row.insert("views".into(), CrdtValue::Integer(0));
        txn.put_row("notes", "n1", row);
        let mut patch1 = RowSnapshot::new();
        patch1.insert("views".into(), CrdtValue::Integer(1));
        txn.patch_row("notes", "n1", patch1);
        let mut patch2 = RowSnapshot::new();
        patch2.insert("views".into(), CrdtValue::Integer(2));
        txn.patch_row("notes", "n1", patch2);
        let deltas = txn.commit();
        assert_eq!(deltas.len(), 1);
        match &deltas[0].kind {
            RowDeltaKind::Added(snapshot) => {
                assert_eq!(snapshot.get("views"), Some(&CrdtValue::Integer(2)));
            }
            _ => panic!("expected Added"),
        }
    }

    #[test]
    fn delete_across_transactions_fires_delete_event() {
        let mut doc = CrdtDocument::new();
        let mut row = RowSnapshot::new();
        row.insert("id".into(), field("n1"));
        doc.begin().put_row("notes", "n1", row);
        let mut txn = doc.begin();
        txn.delete_row("notes", "n1");
        let deltas = txn.commit();
        assert_eq!(deltas.len(), 1);
        assert!(matches!(deltas[0].kind, RowDeltaKind::Deleted));
    }
}
