//! `GET /openapi` (§4.12, §6): a minimal but structurally real OpenAPI 3.0 document
//! describing every action across every workspace, so a client can discover the action
//! surface without reading source.

use epicenter_core::action::ActionKind;
use epicenter_core::epicenter::Client;
use serde_json::{json, Value};

/// Build the OpenAPI document for every workspace/action `client` currently exposes.
///
/// Each action's declared input/output shape isn't reified as a JSON Schema by the
/// core (actions validate via `serde`'s `Deserialize`, not a schema object), so
/// `requestBody`/`responses` use an open `object` schema — honest about what the Action
/// System actually exposes, rather than fabricating per-field schemas we cannot derive.
pub fn build(client: &Client) -> Value {
    let mut paths = serde_json::Map::new();

    for workspace_id in client.workspace_ids() {
        let Some(workspace_client) = client.workspace(workspace_id) else {
            continue;
        };
        for (name, action) in workspace_client.actions() {
            let path = format!("/workspaces/{workspace_id}/{name}");
            let operation_id = format!("{workspace_id}_{name}");
            let method = match action.kind() {
                ActionKind::Query => "get",
                ActionKind::Mutation => "post",
            };
            let mut operation = serde_json::Map::new();
            operation.insert("operationId".to_string(), json!(operation_id));
            if let Some(description) = action.description() {
                operation.insert("summary".to_string(), json!(description));
            }
            operation.insert(
                "responses".to_string(),
                json!({
                    "200": {
                        "description": "Action succeeded",
                        "content": { "application/json": { "schema": { "type": "object" } } }
                    },
                    "default": {
                        "description": "Structured action error",
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "properties": {
                                        "code": { "type": "string" },
                                        "message": { "type": "string" },
                                        "context": {}
                                    },
                                    "required": ["code", "message"]
                                }
                            }
                        }
                    }
                }),
            );
            if matches!(action.kind(), ActionKind::Mutation) {
                operation.insert(
                    "requestBody".to_string(),
                    json!({
                        "required": true,
                        "content": { "application/json": { "schema": { "type": "object" } } }
                    }),
                );
            }

            let entry = paths.entry(path).or_insert_with(|| json!({}));
            entry[method] = Value::Object(operation);
        }
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Epicenter",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": Value::Object(paths),
    })
}
