//! `mailvet batches` command implementation
//!
//! Lists running and recently completed batches.

use crate::commands::{status_label, table};
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::{BatchSummary, Orchestrator};
use crate::progress;
use colored::Colorize;

fn summary_table(rows: &[BatchSummary]) -> comfy_table::Table {
    let mut table = table();
    table.set_header(vec![
        "Name", "Batch ID", "Status", "Progress", "Valid", "Invalid", "Risky", "Updated",
    ]);
    for row in rows {
        table.add_row(vec![
            row.name.clone(),
            row.id.clone(),
            status_label(row.status).to_string(),
            format!("{}% ({}/{})", row.progress, row.processed, row.total),
            row.valid.to_string(),
            row.invalid.to_string(),
            row.risky.to_string(),
            row.observed_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

/// List batches known to the service
pub async fn run(config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;

    let spinner = progress::create_spinner("Fetching batches...");
    let listing = orchestrator.refresh_listings().await;
    spinner.finish_and_clear();
    let listing = listing?;

    if listing.is_empty() {
        println!("No batches found.");
        println!("Run 'mailvet verify' to submit one.");
        return Ok(());
    }

    println!("{}", format!("Running ({})", listing.running.len()).cyan().bold());
    if listing.running.is_empty() {
        println!("  none");
    } else {
        println!("{}", summary_table(&listing.running));
    }
    println!();

    println!("{}", format!("Recent ({})", listing.recent.len()).cyan().bold());
    if listing.recent.is_empty() {
        println!("  none");
    } else {
        println!("{}", summary_table(&listing.recent));
    }

    Ok(())
}
