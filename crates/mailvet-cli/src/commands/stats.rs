//! `mailvet stats` command implementation

use crate::commands::table;
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use colored::Colorize;

/// Show lifetime verification statistics
pub async fn run(config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let stats = orchestrator.refresh_statistics().await?;
    let counts = stats.categories;

    println!("{}", "Verification statistics".cyan().bold());

    let mut t = table();
    t.set_header(vec!["Category", "Count"]);
    t.add_row(vec!["Valid".to_string(), counts.valid.to_string()]);
    t.add_row(vec!["Invalid".to_string(), counts.invalid.to_string()]);
    t.add_row(vec!["Risky".to_string(), counts.risky.to_string()]);
    t.add_row(vec!["Total".to_string(), counts.total.to_string()]);
    println!("{}", t);

    println!("Verification rate: {}", format!("{:.1}%", stats.verification_rate()).green());
    if let Some(ts) = &stats.timestamp {
        println!("As of: {}", ts.dimmed());
    }
    Ok(())
}
