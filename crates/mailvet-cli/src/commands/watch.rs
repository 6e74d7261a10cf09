//! `mailvet watch` command implementation
//!
//! Follows an already submitted batch by polling its status.

use crate::commands::{follow_run, print_run_summary};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::orchestrator::Orchestrator;
use crate::progress;
use colored::Colorize;
use mailvet_common::BatchStatus;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Poll a batch until it completes
pub async fn run(config: &Config, batch_id: String, cancel: CancellationToken) -> Result<()> {
    println!(
        "{} Watching batch {} (every {}s, Ctrl-C to stop)",
        "→".cyan(),
        batch_id.bold(),
        config.poll_interval.as_secs()
    );

    let orchestrator = Orchestrator::from_config(config)?;
    let render = follow_run(orchestrator.subscribe(), progress::create_verification_bar(0));

    let snapshot = orchestrator.watch(&batch_id, &cancel).await;
    drop(orchestrator);
    if let Err(e) = render.await {
        debug!(error = %e, "Progress renderer stopped abnormally");
    }

    print_run_summary(&snapshot);

    if snapshot.status() == BatchStatus::Completed {
        Ok(())
    } else {
        Err(CliError::run_failed(
            snapshot
                .run
                .failure
                .unwrap_or_else(|| "batch did not complete".to_string()),
        ))
    }
}
