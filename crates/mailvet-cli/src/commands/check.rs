//! `mailvet check` command implementation

use crate::api::ApiClient;
use crate::commands::category_label;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;

/// Verify a single address
pub async fn run(config: &Config, email: String) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let result = client.verify_email(email.trim()).await?;

    println!("{}  {}", result.email.bold(), category_label(result.category));
    if let Some(provider) = &result.provider {
        println!("  Provider:  {}", provider);
    }
    if let Some(ts) = &result.timestamp {
        println!("  Checked:   {}", ts.dimmed());
    }
    Ok(())
}
