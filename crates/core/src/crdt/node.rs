//! The recursive map structure backing every level of a [`CrdtDocument`](super::document::CrdtDocument):
//! the kv map, each table's row-map, and each row's field-map are all a `Node` (§4.3).
//!
//! Grounded on the teacher's `crdt::doc::Node`: a flat `HashMap<String, Value>` with
//! tombstone-aware removal and recursive structural merge. This version attaches a
//! per-entry logical clock tick (the document's commit counter) so that the delete-vs-
//! concurrent-update tie-break in §4.4 ("delete wins only if its timestamp is greater
//! than every field update") reduces to a single clock comparison at the entry that
//! changed last, instead of eidetica's Merkle-DAG-ordered traversal (this crate has no
//! DAG of entries to order by, so the document's own monotonic commit counter plays
//! that role).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value::CrdtValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: CrdtValue,
    clock: u64,
}

/// A tombstone-aware, recursively-mergeable map keyed by `String`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    entries: HashMap<String, Entry>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|e| e.value.is_deleted())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(e) if !e.value.is_deleted())
    }

    pub fn get(&self, key: &str) -> Option<&CrdtValue> {
        match self.entries.get(key) {
            Some(e) if !e.value.is_deleted() => Some(&e.value),
            _ => None,
        }
    }

    /// Live keys only (tombstones hidden), in arbitrary map order — callers that need
    /// insertion order (e.g. the markdown materializer's frontmatter) track it separately.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.value.is_deleted())
            .map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CrdtValue)> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.value.is_deleted())
            .map(|(k, e)| (k, &e.value))
    }

    /// Set `key` to `value`, stamped with `clock`. Used by [`super::document::CrdtDocument`]
    /// during a commit; every entry touched in the same commit shares that commit's tick.
    pub fn set(&mut self, key: impl Into<String>, value: CrdtValue, clock: u64) {
        self.entries.insert(key.into(), Entry { value, clock });
    }

    /// Tombstone `key` at `clock`, returning whether it was previously live.
    pub fn remove(&mut self, key: &str, clock: u64) -> bool {
        let was_live = self.contains_key(key);
        self.entries
            .insert(key.to_string(), Entry { value: CrdtValue::Deleted, clock });
        was_live
    }

    pub fn entry_or_insert_node(&mut self, key: &str, clock: u64) -> &mut Node {
        let needs_init = !matches!(
            self.entries.get(key),
            Some(Entry { value: CrdtValue::Node(_), .. })
        );
        if needs_init {
            self.entries.insert(
                key.to_string(),
                Entry {
                    value: CrdtValue::Node(Node::new()),
                    clock,
                },
            );
        }
        self.entries.get_mut(key).unwrap().value.as_node_mut().unwrap()
    }

    /// Recursively merge `other` into a clone of `self` (§4.3, §4.4).
    ///
    /// - Both sides a live `Node`: structural recursive merge regardless of clock — this
    ///   is what lets two concurrent `insert`s on the same row id converge to the union
    ///   of their fields rather than one clobbering the other.
    /// - Otherwise (scalar vs scalar, or either side a tombstone): the higher `clock`
    ///   wins outright. A tombstone therefore only wins over a concurrent field update
    ///   when it is stamped with a later commit than that update, matching §4.4.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, their) in other.entries.iter() {
            match merged.entries.get(key) {
                None => {
                    merged.entries.insert(key.clone(), their.clone());
                }
                Some(ours) => {
                    let both_live_nodes = matches!(
                        (&ours.value, &their.value),
                        (CrdtValue::Node(_), CrdtValue::Node(_))
                    );
                    if both_live_nodes {
                        let a = ours.value.as_node().unwrap();
                        let b = their.value.as_node().unwrap();
                        let merged_node = a.merge(b);
                        let clock = ours.clock.max(their.clock);
                        merged.entries.insert(
                            key.clone(),
                            Entry {
                                value: CrdtValue::Node(merged_node),
                                clock,
                            },
                        );
                    } else if their.clock > ours.clock {
                        merged.entries.insert(key.clone(), their.clone());
                    }
                    // else: keep `ours` (either equal clock, ours wins ties deterministically
                    // by leaving `merged` untouched, or ours is strictly newer).
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_nodes_merge_structurally_regardless_of_clock() {
        let mut a = Node::new();
        a.set("title", CrdtValue::Text("A".into()), 1);
        let mut b = Node::new();
        b.set("body", CrdtValue::Text("B".into()), 1);
        let merged = a.merge(&b);
        assert_eq!(merged.get("title"), Some(&CrdtValue::Text("A".into())));
        assert_eq!(merged.get("body"), Some(&CrdtValue::Text("B".into())));
    }

    #[test]
    fn later_tombstone_beats_earlier_update() {
        let mut table = Node::new();
        table.set("row1", CrdtValue::Node(Node::new()), 1);
        let mut deleted = Node::new();
        deleted.remove("row1", 5);
        let merged = table.merge(&deleted);
        assert!(!merged.contains_key("row1"));
    }

    #[test]
    fn earlier_tombstone_loses_to_later_update() {
        let mut table = Node::new();
        table.remove("row1", 1);
        let mut updated = Node::new();
        updated.set("row1", CrdtValue::Node(Node::new()), 5);
        let merged = table.merge(&updated);
        assert!(merged.contains_key("row1"));
    }
}
