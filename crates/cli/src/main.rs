//! The `epicenter` binary: the CLI surface over a sample Epicenter application (§6),
//! plus `serve`, which runs the same application's REST+WebSocket surface (§4.12).
//!
//! Grounded on the teacher's `main.rs` (parse args, init tracing, dispatch on the
//! subcommand, default to `serve` with none given).

mod cli;
mod demo;
mod dispatch;
mod output;

use std::process::ExitCode;

use output::OutputFormat;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("epicenter=info")),
        )
        .init();

    let config = epicenter_core::config::EpicenterConfig::from_env(cli::DEFAULT_ROOT);

    let demo::Demo { epicenter, sync_providers } = match demo::build(config) {
        Ok(demo) => demo,
        Err(e) => {
            output::print_error("startup-failed", &e.to_string());
            return ExitCode::from(2);
        }
    };

    let client = epicenter.client();
    let command = cli::build(&client);
    let matches = command.get_matches();

    let format = if matches.get_flag("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match matches.subcommand() {
        Some(("serve", sub)) => {
            let args = cli::ServeArgs {
                host: sub.get_one::<String>("host").cloned().unwrap_or_else(|| cli::DEFAULT_HOST.to_string()),
                port: *sub.get_one::<u16>("port").unwrap_or(&8080),
            };
            dispatch::run_serve(epicenter, sync_providers, args).await
        }
        Some(("health", sub)) => {
            let args = cli::HealthArgs {
                url: sub.get_one::<String>("url").cloned().unwrap_or_default(),
                timeout_secs: *sub.get_one::<u64>("timeout").unwrap_or(&5),
            };
            dispatch::run_health(args).await
        }
        Some((workspace_id, sub)) => {
            let Some((action_name, action_matches)) = sub.subcommand() else {
                eprintln!("no action given for workspace '{workspace_id}'; see --help");
                return ExitCode::from(1);
            };

            if let Err(e) = epicenter.start().await {
                output::print_error("workspace-start-failed", &e.to_string());
                return ExitCode::from(2);
            }

            let code = dispatch::run_action(&client, workspace_id, action_name, action_matches, format).await;
            epicenter.shutdown().await;
            code
        }
        None => {
            eprintln!("no subcommand given; see --help");
            ExitCode::from(1)
        }
    }
}
