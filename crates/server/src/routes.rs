//! HTTP route handlers (§4.12): health, the OpenAPI document, and action invocation.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};

use epicenter_core::action::ActionKind;

use crate::errors::{status_for_action_code, ServerError};
use crate::openapi;
use crate::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_openapi(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(openapi::build(&state.client))
}

/// `POST /workspaces/<workspace-id>/<action>`: invoke a mutation with a JSON body.
pub async fn invoke_post(
    State(state): State<Arc<AppState>>,
    Path((workspace_id, action)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let input = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(json!({ "code": "validation-failed", "message": format!("invalid JSON body: {e}") })),
                )
                    .into_response();
            }
        }
    };
    match invoke(&state, &workspace_id, &action, "POST", ActionKind::Mutation, input).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// `GET /workspaces/<workspace-id>/<action>`: invoke a query whose input fits in the
/// query string. Query pairs are passed through as string-valued JSON object fields;
/// the action's own input validator is responsible for any further coercion.
pub async fn invoke_get(
    State(state): State<Arc<AppState>>,
    Path((workspace_id, action)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let input = Value::Object(params.into_iter().map(|(k, v)| (k, Value::String(v))).collect());
    match invoke(&state, &workspace_id, &action, "GET", ActionKind::Query, input).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn invoke(
    state: &AppState,
    workspace_id: &str,
    action: &str,
    method: &'static str,
    expected_kind: ActionKind,
    input: Value,
) -> Result<Response, ServerError> {
    let workspace_client = state
        .client
        .workspace(workspace_id)
        .ok_or_else(|| ServerError::UnknownWorkspace(workspace_id.to_string()))?;
    let handle = workspace_client
        .actions()
        .get(action)
        .ok_or_else(|| ServerError::UnknownAction(action.to_string(), workspace_id.to_string()))?;

    if handle.kind() != expected_kind {
        return Err(ServerError::WrongMethod {
            action: action.to_string(),
            kind: match handle.kind() {
                ActionKind::Query => "query",
                ActionKind::Mutation => "mutation",
            },
            method,
        });
    }

    match workspace_client.invoke(action, input).await {
        Ok(output) => Ok(Json(output).into_response()),
        Err(err) => Ok((status_for_action_code(&err.code), Json(err)).into_response()),
    }
}
