//! `mailvet export` command implementation
//!
//! Downloads a batch's results and writes them to a file.

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use mailvet_common::ExportCategory;
use std::path::PathBuf;

/// File name used when no output path is given
pub fn default_output(batch_id: &str, category: ExportCategory) -> PathBuf {
    let safe: String = batch_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    PathBuf::from(format!("{}-{}.csv", safe, category))
}

/// Export a batch's results
pub async fn run(
    config: &Config,
    batch_id: String,
    category: ExportCategory,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let bytes = client.export_batch(&batch_id, category).await?;

    let path = output.unwrap_or_else(|| default_output(&batch_id, category));
    tokio::fs::write(&path, &bytes).await?;

    println!(
        "{} Exported {} results of {} to {} ({} bytes)",
        "✓".green(),
        category,
        batch_id.bold(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output("J1", ExportCategory::All),
            PathBuf::from("J1-all.csv")
        );
        assert_eq!(
            default_output("../a b", ExportCategory::Risky),
            PathBuf::from("___a_b-risky.csv")
        );
    }
}
