//! Dispatch a parsed [`clap::ArgMatches`] tree to the `serve`/`health` commands or to
//! an action invocation, and translate the result into the process exit code §6 defines:
//! 0 on success, 1 on a validation-flavored failure, 2 on any other action-reported error.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;

use epicenter_core::epicenter::{Client, Epicenter};
use epicenter_server::BroadcastSyncProvider;

use crate::cli::{HealthArgs, ServeArgs};
use crate::output::{print_error, print_result, OutputFormat};

/// Error codes §7 classifies as the caller's fault — a malformed or out-of-range
/// input — as opposed to a row-not-found/conflict/internal failure. Mirrors
/// `epicenter_server::status_for_action_code`'s 400-vs-other split, since both surfaces
/// are translating the same taxonomy.
const VALIDATION_CODES: &[&str] = &[
    "validation-failed",
    "bad-date-format",
    "bad-id",
    "not-in-options",
    "missing-required",
    "out-of-range",
    "immutable-id",
];

fn exit_code_for_action_code(code: &str) -> ExitCode {
    if VALIDATION_CODES.contains(&code) {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}

/// Merge `--field key=value` pairs into one JSON object; each value is parsed as JSON
/// first (so `--field done=true` and `--field count=3` come through typed), falling
/// back to a plain string when it doesn't parse.
fn fields_to_json(fields: &[String]) -> Result<serde_json::Value, String> {
    let mut map = serde_json::Map::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{field}'"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(serde_json::Value::Object(map))
}

fn build_input(matches: &ArgMatches) -> Result<serde_json::Value, String> {
    if let Some(raw) = matches.get_one::<String>("input") {
        return serde_json::from_str(raw).map_err(|e| format!("invalid --input JSON: {e}"));
    }
    let fields: Vec<String> = matches
        .get_many::<String>("field")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    fields_to_json(&fields)
}

/// Run `serve`. `sync_providers` is whatever the host application registered per
/// workspace (§4.10) — the sample app registers one per workspace in `demo::build`.
pub async fn run_serve(
    epicenter: Epicenter,
    sync_providers: HashMap<String, Arc<BroadcastSyncProvider>>,
    args: ServeArgs,
) -> ExitCode {
    use std::net::SocketAddr;

    let epicenter = Arc::new(epicenter);
    if let Err(e) = epicenter.start().await {
        print_error("workspace-start-failed", &e.to_string());
        return ExitCode::from(2);
    }

    let state = Arc::new(epicenter_server::AppState::new(epicenter, sync_providers));
    let addr: SocketAddr = match format!("{}:{}", args.host, args.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            print_error("invalid-address", &e.to_string());
            return ExitCode::from(2);
        }
    };

    match epicenter_server::serve(state, addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error("server-failed", &e.to_string());
            ExitCode::from(2)
        }
    }
}

/// Run `health`: GET the server's root (`routes::health`, §4.12) and report whether it
/// responds.
pub async fn run_health(args: HealthArgs) -> ExitCode {
    let url = args.url.trim_end_matches('/').to_string();

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            print_error("client-build-failed", &e.to_string());
            return ExitCode::from(2);
        }
    };

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => match response.json::<serde_json::Value>().await {
            Ok(body) if body.get("status").and_then(|s| s.as_str()) == Some("ok") => {
                println!("healthy: {body}");
                ExitCode::SUCCESS
            }
            Ok(body) => {
                print_error("unhealthy", &format!("server returned {body}"));
                ExitCode::from(2)
            }
            Err(e) => {
                print_error("unhealthy", &format!("failed to parse response body: {e}"));
                ExitCode::from(2)
            }
        },
        Ok(response) => {
            print_error("unhealthy", &format!("server returned HTTP status {}", response.status()));
            ExitCode::from(2)
        }
        Err(e) => {
            print_error("unreachable", &format!("failed to connect to {url}: {e}"));
            ExitCode::from(2)
        }
    }
}

/// Run a `<workspace-id> <action>` invocation.
pub async fn run_action(
    client: &Client,
    workspace_id: &str,
    action_name: &str,
    matches: &ArgMatches,
    format: OutputFormat,
) -> ExitCode {
    let input = match build_input(matches) {
        Ok(input) => input,
        Err(message) => {
            print_error("bad-cli-input", &message);
            return ExitCode::from(1);
        }
    };

    let Some(workspace) = client.workspace(workspace_id) else {
        print_error("unknown-workspace", &format!("no workspace named '{workspace_id}'"));
        return ExitCode::from(2);
    };

    match workspace.invoke(action_name, input).await {
        Ok(output) => {
            print_result(format, &output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&e.code, &e.message);
            exit_code_for_action_code(&e.code)
        }
    }
}
