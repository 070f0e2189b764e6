use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The structured error an action handler returns to its caller (§4.11, §7). Unlike
/// every other module's error enum, this one is *returned*, not raised: action
/// handlers propagate failures explicitly as `Result::Err`, never panicking across the
/// CLI/HTTP boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ActionError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl ActionError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new("validation-failed", message)
    }

    pub fn row_not_found(table: &str, id: &str) -> Self {
        Self::new("row-not-found", format!("row '{id}' not found in table '{table}'"))
            .with_context(serde_json::json!({ "table": table, "id": id }))
    }
}

impl From<crate::table::TableError> for ActionError {
    fn from(err: crate::table::TableError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<crate::Error> for ActionError {
    fn from(err: crate::Error) -> Self {
        Self::new(err.code().unwrap_or("internal-error"), err.to_string())
    }
}

impl From<ActionError> for crate::Error {
    fn from(err: ActionError) -> Self {
        crate::Error::Action(err)
    }
}
