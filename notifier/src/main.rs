mod check;
mod config;
mod observability;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "notifier", about = "HTTP gateway for push notifications")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the notification and admin listeners
    Run {
        #[arg(long, default_value = "notifier.yaml")]
        config_path: PathBuf,
    },
    /// Load and validate a config file, then exit
    ValidateConfig {
        #[arg(long, default_value = "notifier.yaml")]
        config_path: PathBuf,
    },
    /// Validate a request body from a JSON file and print the message that would be sent
    CheckPayload { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run { config_path } => run(&config_path),
        CliCommand::ValidateConfig { config_path } => {
            match config::Config::from_file(&config_path) {
                Ok(_) => {
                    println!("{}: ok", config_path.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}: {e}", config_path.display());
                    ExitCode::FAILURE
                }
            }
        }
        CliCommand::CheckPayload { path } => {
            let input = match std::fs::read_to_string(&path) {
                Ok(input) => input,
                Err(e) => {
                    eprintln!("could not read {}: {e}", path.display());
                    return ExitCode::FAILURE;
                }
            };
            match check::check_payload(&input) {
                Ok(message) => {
                    println!("{message}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn run(config_path: &std::path::Path) -> ExitCode {
    let config = match config::Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = observability::init_logging(&config.common.logging);

    if let Some(metrics_config) = &config.common.metrics
        && let Err(e) = observability::init_metrics(metrics_config)
    {
        tracing::error!(error = %e, "Failed to set up metrics");
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = rt.block_on(async {
        tokio::select! {
            result = push_gateway::run(config.gateway) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                Ok(())
            }
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway stopped");
            ExitCode::FAILURE
        }
    }
}
