//! mailvet CLI library
//!
//! Command-line client for a streaming email verification service.
//!
//! # Overview
//!
//! - **Batch verification**: extract addresses from text, submit them and
//!   follow live results (`mailvet verify`)
//! - **Resumed tracking**: poll an existing batch to completion (`mailvet watch`)
//! - **Single checks**: verify one address (`mailvet check`)
//! - **Results**: list batches, inspect and export them (`mailvet batches`,
//!   `mailvet show`, `mailvet export`)
//! - **Statistics**: lifetime category counts (`mailvet stats`)
//! - **Batch names**: local display names for batch ids (`mailvet names`)
//!
//! The engine is usable without the CLI: [`orchestrator::Orchestrator`]
//! wires [`stream`] decoding into the [`tracker::AggregateTracker`] and
//! publishes [`orchestrator::RunEvent`]s.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod names;
pub mod orchestrator;
pub mod poll;
pub mod progress;
pub mod stream;
pub mod tracker;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliError, Result};
pub use names::NameDirectory;
pub use orchestrator::{Orchestrator, RunEvent, RunState};
pub use tracker::{AggregateTracker, BatchRun, RunSnapshot};

use clap::{Parser, Subcommand};
use mailvet_common::ExportCategory;
use std::path::PathBuf;

/// mailvet - batch email verification client
#[derive(Parser, Debug)]
#[command(name = "mailvet")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Verification service URL (overrides MAILVET_SERVER_URL)
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    /// Directory holding local state such as batch names (overrides MAILVET_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a batch of email addresses with live progress
    Verify {
        /// Addresses or free text to extract addresses from
        emails: Vec<String>,

        /// Read additional text from a file (CSV, TXT, ...)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Display name for the batch (generated when omitted)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Follow an existing batch until it completes
    Watch {
        /// Batch identifier
        batch_id: String,
    },

    /// Verify a single email address
    Check {
        /// Address to verify
        email: String,
    },

    /// List running and recent batches
    Batches,

    /// Show a batch with its per-email results
    Show {
        /// Batch identifier
        batch_id: String,
    },

    /// Export a batch's results to a file
    Export {
        /// Batch identifier
        batch_id: String,

        /// Category to export (all, valid, invalid, risky)
        #[arg(short, long, default_value = "all")]
        category: ExportCategory,

        /// Output file (defaults to <batch>-<category>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show lifetime verification statistics
    Stats,

    /// Manage local batch names
    Names {
        #[command(subcommand)]
        command: NamesCommand,
    },
}

/// Batch name subcommands
#[derive(Subcommand, Debug)]
pub enum NamesCommand {
    /// List stored names
    List,

    /// Print the name of a batch
    Get {
        /// Batch identifier
        batch_id: String,
    },

    /// Name a batch
    Set {
        /// Batch identifier
        batch_id: String,

        /// New name
        name: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "mailvet",
            "--server-url",
            "http://svc:5000",
            "verify",
            "a@b.com",
            "c@d.com",
            "--name",
            "Leads",
        ])
        .unwrap();

        assert_eq!(cli.server_url.as_deref(), Some("http://svc:5000"));
        match cli.command {
            Commands::Verify { emails, file, name } => {
                assert_eq!(emails, vec!["a@b.com", "c@d.com"]);
                assert!(file.is_none());
                assert_eq!(name.as_deref(), Some("Leads"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_category() {
        let cli = Cli::try_parse_from(["mailvet", "export", "J1", "--category", "Risky"]).unwrap();
        match cli.command {
            Commands::Export { category, output, .. } => {
                assert_eq!(category, ExportCategory::Risky);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["mailvet", "export", "J1", "--category", "custom"]).is_err());
    }
}
