//! `mailvet names` command implementation
//!
//! Reads and edits the local batch name directory.

use crate::commands::table;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::names::NameDirectory;
use colored::Colorize;

fn open(config: &Config) -> NameDirectory {
    NameDirectory::open(config.data_dir())
}

/// List every stored batch name
pub async fn list(config: &Config) -> Result<()> {
    let dir = open(config);
    let entries = dir.entries()?;

    if entries.is_empty() {
        println!("No batch names stored.");
        return Ok(());
    }

    let mut t = table();
    t.set_header(vec!["Batch ID", "Name"]);
    for (id, name) in &entries {
        t.add_row(vec![id.as_str(), name.as_str()]);
    }
    println!("{}", t);
    if let Some(path) = dir.path() {
        println!("{}", format!("Stored in {}", path.display()).dimmed());
    }
    Ok(())
}

/// Print the stored name of one batch
pub async fn get(config: &Config, batch_id: String) -> Result<()> {
    match open(config).get(&batch_id)? {
        Some(name) => {
            println!("{}", name);
            Ok(())
        }
        None => Err(CliError::name_directory(format!("no name stored for batch '{}'", batch_id))),
    }
}

/// Assign a name to a batch
pub async fn set(config: &Config, batch_id: String, name: String) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::config("batch name must not be empty"));
    }
    open(config).assign(&batch_id, name)?;
    println!("{} {} is now named {}", "✓".green(), batch_id, name.bold());
    Ok(())
}
