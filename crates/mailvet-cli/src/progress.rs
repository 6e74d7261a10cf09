//! Progress bar utilities for CLI operations
//!
//! Renders [`RunSnapshot`]s as a live terminal progress bar. Bars draw to
//! stderr and stay hidden when it is not a terminal.

use crate::tracker::RunSnapshot;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {percent:>3}% {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

/// Create a progress bar for a verification run of `total` addresses
pub fn create_verification_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Move a bar to the state of `snapshot`
pub fn update_bar(pb: &ProgressBar, snapshot: &RunSnapshot) {
    let run = &snapshot.run;
    if pb.length() != Some(run.total) {
        pb.set_length(run.total);
    }
    pb.set_position(run.processed);
    pb.set_message(progress_message(snapshot));
}

/// Counter and timing line shown beside the bar
pub fn progress_message(snapshot: &RunSnapshot) -> String {
    let run = &snapshot.run;
    format!(
        "{} valid  {} invalid  {} risky | elapsed {} | ETA {}",
        run.valid.to_string().green(),
        run.invalid.to_string().red(),
        run.risky.to_string().yellow(),
        snapshot.elapsed_display(),
        snapshot.eta_display()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::names::NameDirectory;
    use crate::stream::ResultRecord;
    use crate::tracker::AggregateTracker;
    use mailvet_common::Category;
    use std::sync::Arc;

    #[test]
    fn test_create_verification_bar() {
        let pb = create_verification_bar(42);
        assert_eq!(pb.length(), Some(42));
        pb.finish_and_clear();
    }

    #[test]
    fn test_create_spinner() {
        let pb = create_spinner("Polling...");
        assert!(!pb.is_finished());
        pb.finish();
    }

    #[test]
    fn test_update_bar_follows_snapshot() {
        colored::control::set_override(false);
        let mut tracker = AggregateTracker::new(4, None, Arc::new(NameDirectory::in_memory()));
        tracker.on_result(&ResultRecord {
            email: "a@b.com".into(),
            category: Category::Valid,
            provider: None,
            timestamp: None,
        });

        let pb = ProgressBar::hidden();
        update_bar(&pb, &tracker.snapshot());
        assert_eq!(pb.position(), 1);
        assert_eq!(pb.length(), Some(4));

        let msg = progress_message(&tracker.snapshot());
        assert!(msg.starts_with("1 valid  0 invalid  0 risky"));
        assert!(msg.contains("ETA "));
    }
}
