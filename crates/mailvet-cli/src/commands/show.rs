//! `mailvet show` command implementation
//!
//! Prints one batch with its per-email results.

use crate::api::ApiClient;
use crate::commands::{category_label, table};
use crate::config::Config;
use crate::error::Result;
use crate::names::NameDirectory;
use colored::Colorize;
use mailvet_common::types::rate;
use mailvet_common::BatchStatus;

/// Show details of a batch
pub async fn run(config: &Config, batch_id: String) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let names = NameDirectory::open(config.data_dir());

    let details = client.batch_details(&batch_id).await?;
    let name = names.resolve(&batch_id)?;
    let status = BatchStatus::from_remote(&details.status);
    let results = details.results;

    println!();
    println!("{}", "═".repeat(60).blue());
    println!("{}", format!("  {}", name).bold());
    println!("{}", "═".repeat(60).blue());
    println!();

    let mut summary = table();
    summary.add_row(vec!["Batch ID".to_string(), details.job_id.clone()]);
    summary.add_row(vec!["Status".to_string(), super::status_label(status).to_string()]);
    summary.add_row(vec![
        "Verified".to_string(),
        format!("{}/{}", details.verified_emails, details.total_emails),
    ]);
    summary.add_row(vec!["Valid".to_string(), results.valid.to_string()]);
    summary.add_row(vec!["Invalid".to_string(), results.invalid.to_string()]);
    summary.add_row(vec!["Risky".to_string(), results.risky_bucket().to_string()]);
    summary.add_row(vec![
        "Valid rate".to_string(),
        format!("{:.1}%", rate(results.valid, results.processed())),
    ]);
    if let Some(start) = &details.start_time {
        summary.add_row(vec!["Started".to_string(), start.clone()]);
    }
    if let Some(end) = &details.end_time {
        summary.add_row(vec!["Finished".to_string(), end.clone()]);
    }
    println!("{}", summary);

    let emails = details.emails();
    if emails.is_empty() {
        println!("No per-email results recorded.");
        return Ok(());
    }

    let mut rows = table();
    rows.set_header(vec!["Email", "Category", "Provider"]);
    for result in emails {
        rows.add_row(vec![
            result.email.clone(),
            category_label(result.category).to_string(),
            result.provider.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!();
    println!("{}", rows);

    Ok(())
}
