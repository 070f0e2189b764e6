use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::date::DateTimeTz;

/// A single field's value in its *serialized* projection (§3).
///
/// This is the form written to non-CRDT materializers and wire protocols: `rich-text`
/// is collapsed to a plain string. The *validated* projection used by application code
/// lives in [`crate::table::ValidatedValue`], which replaces [`Value::RichText`] with a
/// live [`crate::crdt::RichTextHandle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Id(String),
    Text(String),
    Integer(i64),
    Boolean(bool),
    Date(DateTimeTz),
    Select(String),
    Tags(Vec<String>),
    Json(Json),
    RichText(String),
}

impl Value {
    /// A human-readable label for the logical kind this value carries, for error messages.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Value::Id(_) => "id",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Select(_) => "select",
            Value::Tags(_) => "tags",
            Value::Json(_) => "json",
            Value::RichText(_) => "rich-text",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Id(s) | Value::Text(s) | Value::Select(s) | Value::RichText(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            Value::Tags(t) => Some(t),
            _ => None,
        }
    }
}
