//! Leaf and branch values stored inside a [`Node`](super::node::Node) (§4.3).
//!
//! Mirrors the teacher's `crdt::doc::Value` shape (leaf scalars, a nested `Node` branch,
//! and a `Deleted` tombstone for CRDT merge correctness), narrowed to the logical kinds
//! the workspace schema actually needs (`field::Value` maps onto these one-to-one, plus
//! `Node` for a row's field-map and `Deleted` for tombstones).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::node::Node;
use crate::field::Value as FieldValue;

/// A value stored at one key of a [`Node`] (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrdtValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Json(Json),
    /// An ordered, deduplicated set of strings (the `tags` field kind).
    Tags(Vec<String>),
    /// A nested map: a row's field-map, or a table's row-map, or the kv map.
    Node(Node),
    /// A tombstone: the key existed once but was removed. CRDT merges treat a
    /// tombstone as winning over any value with an earlier logical clock, and
    /// losing to one with a later clock (see [`Node::merge`]).
    Deleted,
}

impl CrdtValue {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            CrdtValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            CrdtValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, CrdtValue::Deleted)
    }
}

impl From<&FieldValue> for CrdtValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Id(s) | FieldValue::Text(s) | FieldValue::Select(s) | FieldValue::RichText(s) => {
                CrdtValue::Text(s.clone())
            }
            FieldValue::Integer(i) => CrdtValue::Integer(*i),
            FieldValue::Boolean(b) => CrdtValue::Boolean(*b),
            FieldValue::Date(d) => CrdtValue::Text(d.to_canonical_string()),
            FieldValue::Tags(tags) => CrdtValue::Tags(tags.clone()),
            FieldValue::Json(j) => CrdtValue::Json(j.clone()),
        }
    }
}

impl From<FieldValue> for CrdtValue {
    fn from(value: FieldValue) -> Self {
        CrdtValue::from(&value)
    }
}

/// Reconstruct a field map (`field name -> CrdtValue`) from a row [`Node`], skipping
/// tombstoned keys. Used when building the post-commit row snapshot for an event.
pub fn node_to_field_map(node: &Node) -> HashMap<String, CrdtValue> {
    node.iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
