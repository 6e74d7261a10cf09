//! mailvet CLI - Main entry point

use clap::Parser;
use mailvet_cli::{Cli, Commands, Config, NamesCommand};
use mailvet_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("mailvet")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling");
            trigger.cancel();
        }
    });

    if let Err(e) = execute_command(cli, cancel).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli, cancel: CancellationToken) -> mailvet_cli::Result<()> {
    let config = Config::from_env()?.with_overrides(cli.server_url, cli.data_dir);

    match cli.command {
        Commands::Verify { emails, file, name } => {
            mailvet_cli::commands::verify::run(&config, emails, file, name, cancel).await
        }

        Commands::Watch { batch_id } => {
            mailvet_cli::commands::watch::run(&config, batch_id, cancel).await
        }

        Commands::Check { email } => mailvet_cli::commands::check::run(&config, email).await,

        Commands::Batches => mailvet_cli::commands::batches::run(&config).await,

        Commands::Show { batch_id } => mailvet_cli::commands::show::run(&config, batch_id).await,

        Commands::Export {
            batch_id,
            category,
            output,
        } => mailvet_cli::commands::export::run(&config, batch_id, category, output).await,

        Commands::Stats => mailvet_cli::commands::stats::run(&config).await,

        Commands::Names { command } => match command {
            NamesCommand::List => mailvet_cli::commands::names::list(&config).await,
            NamesCommand::Get { batch_id } => {
                mailvet_cli::commands::names::get(&config, batch_id).await
            }
            NamesCommand::Set { batch_id, name } => {
                mailvet_cli::commands::names::set(&config, batch_id, name).await
            }
        },
    }
}
