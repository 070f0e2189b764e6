//! The *validated row* projection (§3): like [`field::Value`](crate::field::Value), but
//! `rich-text` is a live [`RichTextHandle`] instead of a plain string.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::crdt::RichTextHandle;
use crate::date::DateTimeTz;
use crate::field::Value;

/// A single field's value in application code's hands (§3's "validated row").
#[derive(Debug, Clone)]
pub enum ValidatedValue {
    Id(String),
    Text(String),
    Integer(i64),
    Boolean(bool),
    Date(DateTimeTz),
    Select(String),
    Tags(Vec<String>),
    Json(Json),
    /// A live collaborative handle, not a plain string (contrast [`Value::RichText`]).
    RichText(RichTextHandle),
}

pub type ValidatedRow = HashMap<String, ValidatedValue>;

impl ValidatedValue {
    /// Collapse to the serialized projection (§3): rich-text becomes plain text.
    pub fn to_serialized(&self) -> Value {
        match self {
            ValidatedValue::Id(s) => Value::Id(s.clone()),
            ValidatedValue::Text(s) => Value::Text(s.clone()),
            ValidatedValue::Integer(i) => Value::Integer(*i),
            ValidatedValue::Boolean(b) => Value::Boolean(*b),
            ValidatedValue::Date(d) => Value::Date(d.clone()),
            ValidatedValue::Select(s) => Value::Select(s.clone()),
            ValidatedValue::Tags(t) => Value::Tags(t.clone()),
            ValidatedValue::Json(j) => Value::Json(j.clone()),
            ValidatedValue::RichText(handle) => Value::RichText(handle.to_plain_text()),
        }
    }

    /// Build the validated projection from a serialized value (rich-text is rehydrated
    /// into a fresh [`RichTextHandle`] seeded with the stored plain text).
    pub fn from_serialized(value: &Value) -> Self {
        match value {
            Value::Id(s) => ValidatedValue::Id(s.clone()),
            Value::Text(s) => ValidatedValue::Text(s.clone()),
            Value::Integer(i) => ValidatedValue::Integer(*i),
            Value::Boolean(b) => ValidatedValue::Boolean(*b),
            Value::Date(d) => ValidatedValue::Date(d.clone()),
            Value::Select(s) => ValidatedValue::Select(s.clone()),
            Value::Tags(t) => ValidatedValue::Tags(t.clone()),
            Value::Json(j) => ValidatedValue::Json(j.clone()),
            Value::RichText(s) => ValidatedValue::RichText(RichTextHandle::from_plain_text(s)),
        }
    }
}

/// Collapse a validated row to its serialized projection.
pub fn serialize_row(row: &ValidatedRow) -> HashMap<String, Value> {
    row.iter().map(|(k, v)| (k.clone(), v.to_serialized())).collect()
}

/// Rehydrate a serialized row into its validated projection.
pub fn validate_row_projection(row: &HashMap<String, Value>) -> ValidatedRow {
    row.iter()
        .map(|(k, v)| (k.clone(), ValidatedValue::from_serialized(v)))
        .collect()
}
