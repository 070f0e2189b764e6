//! Mapping from the runtime's structured error codes (§7) to HTTP status codes, and the
//! server's own errors (unknown workspace, wrong HTTP method for an action's kind).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no workspace named '{0}'")]
    UnknownWorkspace(String),

    #[error("no action named '{0}' in workspace '{1}'")]
    UnknownAction(String, String),

    #[error("action '{action}' is a {kind} and cannot be invoked with {method}")]
    WrongMethod {
        action: String,
        kind: &'static str,
        method: &'static str,
    },
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::UnknownWorkspace(_) => (StatusCode::NOT_FOUND, "unknown-workspace"),
            ServerError::UnknownAction(_, _) => (StatusCode::NOT_FOUND, "unknown-action"),
            ServerError::WrongMethod { .. } => (StatusCode::METHOD_NOT_ALLOWED, "wrong-method"),
        };
        (status, Json(json!({ "code": code, "message": self.to_string() }))).into_response()
    }
}

/// The HTTP status an [`epicenter_core::action::ActionError`]'s code maps to (§7's
/// taxonomy; codes not in the table fall back to 500, matching an undocumented or
/// internal failure).
pub fn status_for_action_code(code: &str) -> StatusCode {
    match code {
        "validation-failed" | "bad-date-format" | "bad-id" | "not-in-options" | "missing-required" | "out-of-range"
        | "immutable-id" => StatusCode::BAD_REQUEST,
        "row-not-found" | "unknown-action" => StatusCode::NOT_FOUND,
        "id-conflict" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
