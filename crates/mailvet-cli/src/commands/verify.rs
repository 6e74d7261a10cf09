//! `mailvet verify` command implementation
//!
//! Extracts addresses from arguments and/or a file, submits them as one
//! batch and follows the result stream with a live progress bar.

use crate::commands::{follow_run, print_run_summary};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::extract::extract_emails;
use crate::orchestrator::Orchestrator;
use crate::progress;
use colored::Colorize;
use mailvet_common::BatchStatus;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Gather the text addresses are extracted from
async fn read_input(emails: &[String], file: Option<&PathBuf>) -> Result<String> {
    let mut text = emails.join("\n");
    if let Some(path) = file {
        let contents = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = contents.len(), "Read email file");
        text.push('\n');
        text.push_str(&contents);
    }
    Ok(text)
}

/// Verify a batch of addresses
pub async fn run(
    config: &Config,
    emails: Vec<String>,
    file: Option<PathBuf>,
    name: Option<String>,
    cancel: CancellationToken,
) -> Result<()> {
    let text = read_input(&emails, file.as_ref()).await?;
    let addresses = extract_emails(&text);
    if addresses.is_empty() {
        return Err(CliError::EmptySubmission);
    }

    println!(
        "{} Found {} unique email address(es)",
        "→".cyan(),
        addresses.len()
    );

    let orchestrator = Orchestrator::from_config(config)?;
    let render = follow_run(
        orchestrator.subscribe(),
        progress::create_verification_bar(addresses.len() as u64),
    );

    let snapshot = orchestrator.verify(&addresses, name, &cancel).await?;
    drop(orchestrator);
    if let Err(e) = render.await {
        debug!(error = %e, "Progress renderer stopped abnormally");
    }

    print_run_summary(&snapshot);

    match snapshot.status() {
        BatchStatus::Completed => {
            println!();
            println!("{} Verification complete", "✓".green());
            Ok(())
        }
        _ => Err(CliError::run_failed(
            snapshot
                .run
                .failure
                .unwrap_or_else(|| "run did not complete".to_string()),
        )),
    }
}
