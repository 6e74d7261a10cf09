//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. Shared
//! rendering helpers live here.

pub mod batches;
pub mod check;
pub mod export;
pub mod names;
pub mod show;
pub mod stats;
pub mod verify;
pub mod watch;

use crate::orchestrator::RunEvent;
use crate::progress;
use crate::tracker::RunSnapshot;
use colored::{ColoredString, Colorize};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use indicatif::ProgressBar;
use mailvet_common::{BatchStatus, Category};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

pub(crate) fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub(crate) fn status_label(status: BatchStatus) -> ColoredString {
    match status {
        BatchStatus::Pending => status.as_str().dimmed(),
        BatchStatus::Running => status.as_str().cyan(),
        BatchStatus::Completed => status.as_str().green(),
        BatchStatus::Failed => status.as_str().red(),
    }
}

pub(crate) fn category_label(category: Category) -> ColoredString {
    match category.bucket() {
        Category::Valid => category.as_str().green(),
        Category::Invalid => category.as_str().red(),
        _ => category.as_str().yellow(),
    }
}

/// Drive `pb` from run events until the run ends; returns the bar
pub(crate) fn follow_run(
    mut events: broadcast::Receiver<RunEvent>,
    pb: ProgressBar,
) -> JoinHandle<ProgressBar> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RunEvent::Progress(snapshot)) => progress::update_bar(&pb, &snapshot),
                Ok(RunEvent::Activity(activity)) => {
                    let at = activity.at.format("%H:%M:%S").to_string();
                    pb.println(format!("{} {}", at.dimmed(), activity.message));
                }
                Ok(RunEvent::Completed(snapshot)) => {
                    progress::update_bar(&pb, &snapshot);
                    break;
                }
                Ok(RunEvent::Failed { .. }) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
        pb.finish_and_clear();
        pb
    })
}

/// Final report of a run
pub(crate) fn print_run_summary(snapshot: &RunSnapshot) {
    let run = &snapshot.run;
    let name = run.display_name.as_deref().unwrap_or("Unnamed batch");

    println!();
    println!("{} {}", name.bold(), format!("({})", run.id).dimmed());
    println!("  Status:    {}", status_label(run.status));
    println!("  Processed: {}/{} ({}%)", run.processed, run.total, snapshot.progress);
    println!("  Valid:     {}", run.valid.to_string().green());
    println!("  Invalid:   {}", run.invalid.to_string().red());
    println!("  Risky:     {}", run.risky.to_string().yellow());
    println!("  Valid rate: {:.1}%", snapshot.valid_rate());
    println!("  Elapsed:   {}", snapshot.elapsed_display());
    if let Some(reason) = &run.failure {
        println!("  Reason:    {}", reason.red());
    }
}
