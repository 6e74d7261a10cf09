//! Aggregate tracker
//!
//! Owns the mutable state of one [`BatchRun`] while it is streamed or
//! polled. Everything outside the owning pipeline sees [`RunSnapshot`]
//! copies, published through a `watch` channel after every change.
//!
//! Invariants kept at every observation point:
//!
//! - `processed == valid + invalid + risky`
//! - `processed <= total`
//! - counters never decrease while the run is in progress
//! - status only moves forward (`pending -> running -> completed|failed`)
//!
//! Completion is the one sanctioned correction point: the producer's final
//! totals overwrite whatever the stream accumulated.

use crate::api::types::StatusSnapshot;
use crate::names::{generate_batch_name, NameDirectory};
use crate::stream::{FinalTotals, ResultRecord};
use chrono::{DateTime, Utc};
use mailvet_common::types::{progress_percent, rate};
use mailvet_common::{BatchStatus, Category};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Prefix of the identifier a run carries until the producer assigns one
pub const PLACEHOLDER_PREFIX: &str = "pending-";

/// One verification job in flight or finished
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun {
    pub id: String,
    pub display_name: Option<String>,
    pub total: u64,
    pub processed: u64,
    pub valid: u64,
    pub invalid: u64,
    pub risky: u64,
    pub status: BatchStatus,
    /// Wall-clock time the run was initiated locally
    pub started_at: DateTime<Utc>,
    pub failure: Option<String>,
}

impl BatchRun {
    fn new(id: String, total: u64) -> Self {
        Self {
            id,
            display_name: None,
            total,
            processed: 0,
            valid: 0,
            invalid: 0,
            risky: 0,
            status: BatchStatus::Pending,
            started_at: Utc::now(),
            failure: None,
        }
    }

    pub fn has_placeholder_id(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_PREFIX)
    }

    fn recount(&mut self) {
        self.processed = self.valid + self.invalid + self.risky;
        if self.processed > self.total {
            self.total = self.processed;
        }
    }
}

/// Read-only view of a run at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub run: BatchRun,
    /// Whole percent in `[0, 100]`
    pub progress: u8,
    pub elapsed: Duration,
    /// `None` until at least one result was counted
    pub estimated_remaining: Option<Duration>,
}

impl RunSnapshot {
    pub fn id(&self) -> &str {
        &self.run.id
    }

    pub fn status(&self) -> BatchStatus {
        self.run.status
    }

    pub fn elapsed_display(&self) -> String {
        format_hms(self.elapsed)
    }

    pub fn eta_display(&self) -> String {
        self.estimated_remaining
            .map(format_hms)
            .unwrap_or_else(|| "Calculating...".to_string())
    }

    /// Share of valid results among processed ones, one decimal place
    pub fn valid_rate(&self) -> f64 {
        rate(self.run.valid, self.run.processed)
    }
}

/// Render a duration as `HH:MM:SS`
pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Owner of one run's aggregate counters
pub struct AggregateTracker {
    run: BatchRun,
    started: Instant,
    finished: Option<Instant>,
    requested_name: Option<String>,
    names: Arc<NameDirectory>,
    updates: watch::Sender<RunSnapshot>,
}

impl AggregateTracker {
    /// Fresh run for a submission of `total` addresses
    ///
    /// The run carries a placeholder id until [`on_started`](Self::on_started).
    pub fn new(total: u64, requested_name: Option<String>, names: Arc<NameDirectory>) -> Self {
        let id = format!("{}{}", PLACEHOLDER_PREFIX, uuid::Uuid::new_v4());
        Self::with_run(BatchRun::new(id, total), requested_name, names)
    }

    /// Run for an existing batch tracked by polling
    pub fn resume(batch_id: &str, names: Arc<NameDirectory>) -> Self {
        let mut run = BatchRun::new(batch_id.to_string(), 0);
        run.display_name = match names.get(batch_id) {
            Ok(name) => name,
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "Could not read batch name");
                None
            }
        };
        Self::with_run(run, None, names)
    }

    fn with_run(run: BatchRun, requested_name: Option<String>, names: Arc<NameDirectory>) -> Self {
        let started = Instant::now();
        let initial = RunSnapshot {
            run: run.clone(),
            progress: 0,
            elapsed: Duration::ZERO,
            estimated_remaining: None,
        };
        let (updates, _) = watch::channel(initial);

        Self {
            run,
            started,
            finished: None,
            requested_name,
            names,
            updates,
        }
    }

    /// Receive a fresh snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.updates.subscribe()
    }

    pub fn run(&self) -> &BatchRun {
        &self.run
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let now = self.finished.unwrap_or_else(Instant::now);
        let elapsed = now.saturating_duration_since(self.started);
        let run = &self.run;

        let (progress, estimated_remaining) = match run.status {
            BatchStatus::Completed => (100, Some(Duration::ZERO)),
            _ => {
                let eta = (run.processed > 0).then(|| {
                    let per_item = elapsed.as_secs_f64() / run.processed as f64;
                    let remaining = run.total.saturating_sub(run.processed) as f64;
                    Duration::from_secs_f64((per_item * remaining).max(0.0))
                });
                (progress_percent(run.processed, run.total), eta)
            }
        };

        RunSnapshot {
            run: run.clone(),
            progress,
            elapsed,
            estimated_remaining,
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    fn advance(&mut self, next: BatchStatus) -> bool {
        if !self.run.status.can_advance_to(next) {
            return false;
        }
        debug!(batch_id = %self.run.id, from = %self.run.status, to = %next, "Run status change");
        self.run.status = next;
        if next.is_terminal() {
            self.finished = Some(Instant::now());
        }
        true
    }

    /// The producer assigned the run's identifier
    ///
    /// Records the display name (requested or generated) in the name
    /// directory. A directory failure is logged; it does not fail the run.
    pub fn on_started(&mut self, batch_id: &str) -> bool {
        if self.run.status.is_terminal() {
            warn!(batch_id = %batch_id, "Ignoring start event for a finished run");
            return false;
        }
        if !self.run.has_placeholder_id() {
            if self.run.id != batch_id {
                warn!(
                    current = %self.run.id,
                    batch_id = %batch_id,
                    "Ignoring second start event with a different id"
                );
            }
            return false;
        }

        self.run.id = batch_id.to_string();
        let name = self
            .requested_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(generate_batch_name);
        if let Err(e) = self.names.assign(batch_id, &name) {
            warn!(batch_id = %batch_id, error = %e, "Could not record batch name");
        }
        self.run.display_name = Some(name);
        self.advance(BatchStatus::Running);

        info!(batch_id = %batch_id, name = ?self.run.display_name, "Batch started");
        self.publish();
        true
    }

    /// Count one result record
    ///
    /// Returns `false` when the record was not counted: the run failed, or
    /// counting it would push `processed` past `total`.
    pub fn on_result(&mut self, record: &ResultRecord) -> bool {
        if self.run.status == BatchStatus::Failed {
            return false;
        }
        if self.run.processed >= self.run.total {
            warn!(
                batch_id = %self.run.id,
                email = %record.email,
                total = self.run.total,
                "Dropping result beyond the submitted total"
            );
            return false;
        }

        match record.category.bucket() {
            Category::Valid => self.run.valid += 1,
            Category::Invalid => self.run.invalid += 1,
            _ => self.run.risky += 1,
        }
        self.run.processed += 1;
        self.advance(BatchStatus::Running);

        self.publish();
        true
    }

    /// The producer reported completion
    ///
    /// A repeated completion is a no-op and returns `false`.
    pub fn on_completed(&mut self, totals: Option<&FinalTotals>) -> bool {
        if self.run.status.is_terminal() {
            debug!(
                batch_id = %self.run.id,
                status = %self.run.status,
                "Ignoring repeated completion"
            );
            return false;
        }

        if let Some(totals) = totals {
            self.run.valid = totals.results.valid;
            self.run.invalid = totals.results.invalid;
            self.run.risky = totals.results.risky_bucket();
            if let Some(total) = totals.total_emails.filter(|t| *t > 0) {
                self.run.total = total;
            }
            self.run.recount();
        }
        self.advance(BatchStatus::Completed);

        info!(
            batch_id = %self.run.id,
            processed = self.run.processed,
            valid = self.run.valid,
            invalid = self.run.invalid,
            risky = self.run.risky,
            "Batch completed"
        );
        self.publish();
        true
    }

    /// The run failed; counters freeze at their last values
    pub fn on_failed(&mut self, reason: impl Into<String>) -> bool {
        if self.run.status.is_terminal() {
            return false;
        }
        let reason = reason.into();
        warn!(batch_id = %self.run.id, reason = %reason, "Batch failed");
        self.run.failure = Some(reason);
        self.advance(BatchStatus::Failed);
        self.publish();
        true
    }

    /// Fold a polled status snapshot into the run as one coalesced update
    ///
    /// A completed snapshot is applied through [`on_completed`](Self::on_completed).
    /// Otherwise absolute counters only ever raise the current ones.
    pub fn apply_snapshot(&mut self, snap: &StatusSnapshot) -> bool {
        if self.run.status.is_terminal() {
            return false;
        }

        match snap.batch_status() {
            BatchStatus::Completed => {
                let totals = FinalTotals {
                    results: snap.results,
                    total_emails: Some(snap.total_emails),
                };
                self.on_completed(Some(&totals))
            }
            BatchStatus::Failed => {
                self.on_failed(format!("batch reported status '{}'", snap.status))
            }
            status => {
                self.run.total = self.run.total.max(snap.total_emails);
                self.run.valid = self.run.valid.max(snap.results.valid);
                self.run.invalid = self.run.invalid.max(snap.results.invalid);
                self.run.risky = self.run.risky.max(snap.results.risky_bucket());
                self.run.recount();

                if snap.verified_emails != snap.results.processed() {
                    debug!(
                        batch_id = %self.run.id,
                        verified = snap.verified_emails,
                        categorised = snap.results.processed(),
                        "Snapshot counters disagree; using category totals"
                    );
                }

                self.advance(status);
                self.publish();
                true
            }
        }
    }
}
