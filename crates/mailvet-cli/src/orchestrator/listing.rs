//! Batch listing built from the service's batch index and status snapshots

use crate::api::StatusSnapshot;
use chrono::{DateTime, Utc};
use mailvet_common::types::progress_percent;
use mailvet_common::BatchStatus;

/// One row of the batch listing
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub id: String,
    pub name: String,
    pub status: BatchStatus,
    pub total: u64,
    pub processed: u64,
    pub valid: u64,
    pub invalid: u64,
    pub risky: u64,
    pub progress: u8,
    pub observed_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn from_snapshot(id: &str, name: impl Into<String>, snapshot: &StatusSnapshot) -> Self {
        let status = snapshot.batch_status();
        let results = snapshot.results;
        let processed = results.processed();
        let progress = if status == BatchStatus::Completed {
            100
        } else {
            progress_percent(processed, snapshot.total_emails)
        };

        Self {
            id: id.to_string(),
            name: name.into(),
            status,
            total: snapshot.total_emails,
            processed,
            valid: results.valid,
            invalid: results.invalid,
            risky: results.risky_bucket(),
            progress,
            observed_at: snapshot.observed_at(),
        }
    }
}

/// Batches split into those still in progress and those already completed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchListing {
    pub running: Vec<BatchSummary>,
    pub recent: Vec<BatchSummary>,
}

impl BatchListing {
    /// Split summaries by status, each list newest first
    pub fn from_summaries(summaries: impl IntoIterator<Item = BatchSummary>) -> Self {
        let (mut recent, mut running): (Vec<_>, Vec<_>) = summaries
            .into_iter()
            .partition(|s| s.status == BatchStatus::Completed);

        // Option orders None first, so descending puts undated batches last
        running.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        recent.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));

        Self { running, recent }
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.recent.is_empty()
    }

    pub fn len(&self) -> usize {
        self.running.len() + self.recent.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mailvet_common::CategoryTotals;

    fn snap(status: &str, ts: Option<&str>, valid: u64, total: u64) -> StatusSnapshot {
        StatusSnapshot {
            job_id: String::new(),
            status: status.to_string(),
            total_emails: total,
            verified_emails: valid,
            results: CategoryTotals::new(valid, 0, 0),
            timestamp: ts.map(str::to_string),
        }
    }

    #[test]
    fn test_summary_progress() {
        let s = BatchSummary::from_snapshot("J1", "Name", &snap("running", None, 1, 4));
        assert_eq!(s.progress, 25);
        assert_eq!(s.status, BatchStatus::Running);

        let done = BatchSummary::from_snapshot("J2", "Name", &snap("completed", None, 3, 4));
        assert_eq!(done.progress, 100);
    }

    #[test]
    fn test_listing_split_and_order() {
        let listing = BatchListing::from_summaries(vec![
            BatchSummary::from_snapshot(
                "old",
                "a",
                &snap("completed", Some("2024-01-01T10:00:00Z"), 1, 1),
            ),
            BatchSummary::from_snapshot("undated", "b", &snap("completed", None, 1, 1)),
            BatchSummary::from_snapshot(
                "new",
                "c",
                &snap("completed", Some("2024-03-01T10:00:00Z"), 1, 1),
            ),
            BatchSummary::from_snapshot(
                "live",
                "d",
                &snap("running", Some("2024-02-01T10:00:00"), 0, 5),
            ),
            BatchSummary::from_snapshot("queued", "e", &snap("pending", None, 0, 5)),
        ]);

        let recent: Vec<_> = listing.recent.iter().map(|s| s.id.as_str()).collect();
        let running: Vec<_> = listing.running.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(recent, vec!["new", "old", "undated"]);
        assert_eq!(running, vec!["live", "queued"]);
        assert_eq!(listing.len(), 5);
    }
}
