//! The command-line surface (§6): `serve` and `health` plus, for every action an
//! `Epicenter` declares, a `<workspace-id> <action>` subcommand.
//!
//! Grounded on the teacher's `cli.rs` (a `#[derive(Parser)]` `Cli`/`Commands` tree with
//! env-var-backed `*Args` structs, §6's CLI surface): `serve` and `health` below keep
//! that exact shape. The per-action commands can't be named at compile time, so they're
//! assembled with clap's builder API (`clap::Command`) instead of the derive macro —
//! the same library, the dynamic half of its API.

use clap::{value_parser, Arg, ArgAction, Command};

use epicenter_core::action::Action;
use epicenter_core::epicenter::Client;

/// The data root is resolved from `EPICENTER_ROOT` (or this default) before the
/// application — and so this command tree, which is built from its actions — exists,
/// so it is a plain environment variable rather than a `--root` flag here.
pub const DEFAULT_ROOT: &str = "./epicenter-data";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "8080";

/// Arguments for `serve` (mirrors the teacher's `ServeArgs`: a host, a port, both
/// overridable by environment variable).
#[derive(Debug, Clone)]
pub struct ServeArgs {
    pub host: String,
    pub port: u16,
}

/// Arguments for `health` (mirrors the teacher's `HealthArgs`).
#[derive(Debug, Clone)]
pub struct HealthArgs {
    pub url: String,
    pub timeout_secs: u64,
}

/// Build the root command. Subcommand shape:
///
/// ```text
/// epicenter serve [--host] [--port]
/// epicenter health [--url] [--timeout]
/// epicenter <workspace-id> <action> [--field KEY=VALUE]... [--input JSON]
/// ```
pub fn build(client: &Client) -> Command {
    let mut root = Command::new("epicenter")
        .about("Run and drive an Epicenter application (§6 CLI surface)")
        .subcommand_required(false)
        .arg_required_else_help(false)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print machine-readable JSON instead of a table"),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the REST+WebSocket server surface (§4.12)")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .env("EPICENTER_HOST")
                        .default_value(DEFAULT_HOST),
                )
                .arg(
                    Arg::new("port")
                        .long("port")
                        .env("EPICENTER_PORT")
                        .value_parser(value_parser!(u16))
                        .default_value(DEFAULT_PORT),
                ),
        )
        .subcommand(
            Command::new("health")
                .about("Check a running server's / health endpoint")
                .arg(
                    Arg::new("url")
                        .long("url")
                        .env("EPICENTER_URL")
                        .default_value("http://127.0.0.1:8080"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .default_value("5"),
                ),
        );

    let mut workspace_ids: Vec<&str> = client.workspace_ids().collect();
    workspace_ids.sort_unstable();

    for workspace_id in workspace_ids {
        let workspace = client.workspace(workspace_id).expect("just listed");
        let mut workspace_cmd =
            Command::new(workspace_id.to_string()).about(format!("Actions on workspace '{workspace_id}'"));

        let mut action_names: Vec<&String> = workspace.actions().keys().collect();
        action_names.sort();

        for action_name in action_names {
            let action = &workspace.actions()[action_name];
            let mut action_cmd = Command::new(action_name.clone());
            if let Some(description) = action.description() {
                action_cmd = action_cmd.about(description.to_string());
            }
            action_cmd = action_cmd
                .arg(
                    Arg::new("field")
                        .long("field")
                        .short('f')
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append)
                        .help("One input field; repeatable. VALUE is parsed as JSON, falling back to a plain string"),
                )
                .arg(
                    Arg::new("input")
                        .long("input")
                        .value_name("JSON")
                        .conflicts_with("field")
                        .help("The action's full input as one JSON object, instead of --field"),
                );
            workspace_cmd = workspace_cmd.subcommand(action_cmd);
        }

        root = root.subcommand(workspace_cmd);
    }

    root
}
