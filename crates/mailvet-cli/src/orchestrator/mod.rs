//! Batch orchestrator
//!
//! Starts runs and wires the pipeline together: a submission streams
//! through [`ndjson_lines`] and [`classify`] into an [`AggregateTracker`];
//! a known batch id is followed by the [`PollReconciler`] instead. Every
//! step is published on the [`EventBus`].
//!
//! Each run owns its own [`RunMachine`]; runs are never reused.

pub mod events;
pub mod listing;

pub use events::{Activity, EventBus, RunEvent};
pub use listing::{BatchListing, BatchSummary};

use crate::api::{ApiClient, CategoryStats, StatusSource};
use crate::config::{Config, DEFAULT_LOG_EVERY};
use crate::error::{CliError, Result};
use crate::names::NameDirectory;
use crate::poll::{PollReconciler, CANCELLED};
use crate::stream::{classify, ndjson_lines, VerificationEvent};
use crate::tracker::{AggregateTracker, RunSnapshot};
use bytes::Bytes;
use futures::future::join_all;
use futures::{Stream, StreamExt};
use mailvet_common::BatchStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest excerpt of a malformed line kept in the log
const LOG_EXCERPT_LEN: usize = 120;

/// How long trailing records are still read once the batch has completed
const COMPLETION_GRACE: Duration = Duration::from_millis(250);

/// Lifecycle state of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Submitting,
    Streaming,
    Polling,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Idle, Polling)
                | (Submitting, Streaming)
                | (Submitting, Failed)
                | (Streaming, Completed)
                | (Streaming, Failed)
                | (Polling, Completed)
                | (Polling, Failed)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Submitting => "submitting",
            RunState::Streaming => "streaming",
            RunState::Polling => "polling",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// State machine of a single run
pub struct RunMachine {
    state: RunState,
    events: EventBus,
}

impl RunMachine {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: RunState::Idle,
            events,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Move to `next`; an illegal transition is ignored and reported as `false`
    pub fn transition(&mut self, next: RunState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!(from = %self.state, to = %next, "Ignoring illegal run transition");
            return false;
        }
        let from = std::mem::replace(&mut self.state, next);
        self.events.emit(RunEvent::StateChanged { from, to: next });
        true
    }
}

/// A run in progress: its counters and its lifecycle
struct ActiveRun {
    tracker: AggregateTracker,
    machine: RunMachine,
}

pub struct Orchestrator {
    client: ApiClient,
    status: Arc<dyn StatusSource>,
    names: Arc<NameDirectory>,
    events: EventBus,
    poll_interval: Duration,
    log_every: u64,
}

impl Orchestrator {
    pub fn new(client: ApiClient, names: Arc<NameDirectory>, poll_interval: Duration) -> Self {
        let status: Arc<dyn StatusSource> = Arc::new(client.clone());
        Self {
            client,
            status,
            names,
            events: EventBus::default(),
            poll_interval,
            log_every: DEFAULT_LOG_EVERY,
        }
    }

    /// Orchestrator backed by the configured service and data directory
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ApiClient::from_config(config)?;
        let names = Arc::new(NameDirectory::open(config.data_dir()));
        Ok(Self::new(client, names, config.poll_interval).with_log_every(config.log_every))
    }

    /// Emit an activity line every `n` counted results
    pub fn with_log_every(mut self, n: u64) -> Self {
        self.log_every = n.max(1);
        self
    }

    /// Substitute where status snapshots come from
    pub fn with_status_source(mut self, status: Arc<dyn StatusSource>) -> Self {
        self.status = status;
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn names(&self) -> &Arc<NameDirectory> {
        &self.names
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    fn begin_run(&self, tracker: AggregateTracker) -> ActiveRun {
        ActiveRun {
            tracker,
            machine: RunMachine::new(self.events.clone()),
        }
    }

    /// Submit `emails` and follow the event stream to the end
    ///
    /// Only an empty submission is an error; it is rejected before any
    /// request is made. Every other outcome, cancellation included, is
    /// reported through the returned snapshot's status.
    pub async fn verify(
        &self,
        emails: &[String],
        name: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<RunSnapshot> {
        if emails.is_empty() {
            return Err(CliError::EmptySubmission);
        }

        let tracker = AggregateTracker::new(emails.len() as u64, name, Arc::clone(&self.names));
        let mut run = self.begin_run(tracker);
        run.machine.transition(RunState::Submitting);
        info!(count = emails.len(), "Submitting batch");

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(self.fail(run, CANCELLED)),
            submitted = self.client.submit_batch(emails) => submitted,
        };

        match submitted {
            Ok(chunks) => Ok(self.drive_stream(run, chunks, cancel).await),
            Err(e) => Ok(self.fail(run, e.to_string())),
        }
    }

    /// Feed an open response body through decoder, classifier and tracker
    ///
    /// Results arriving within [`COMPLETION_GRACE`] after completion are still
    /// applied, subject to the `processed <= total` cap; then the stream is
    /// dropped whether or not the producer closed it. A stream that ends
    /// before completion fails the run.
    async fn drive_stream<S>(
        &self,
        mut run: ActiveRun,
        chunks: S,
        cancel: &CancellationToken,
    ) -> RunSnapshot
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        run.machine.transition(RunState::Streaming);
        let mut lines = std::pin::pin!(ndjson_lines(chunks));
        let mut counted: u64 = 0;
        let mut drain_until: Option<Instant> = None;

        loop {
            let grace = async move {
                match drain_until {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                _ = grace => None,
                next = lines.next() => Some(next),
            };

            let line = match next {
                // Cancelled, or the completion grace ran out
                None => {
                    if run.machine.state().is_terminal() {
                        break;
                    }
                    return self.fail(run, CANCELLED);
                }
                Some(None) => break,
                Some(Some(Err(e))) => {
                    if run.machine.state().is_terminal() {
                        warn!(error = %e, "Stream error after completion");
                        break;
                    }
                    return self.fail(run, format!("stream error: {}", e));
                }
                Some(Some(Ok(line))) => line,
            };

            match classify(&line) {
                Err(e) => {
                    warn!(error = %e, line = %excerpt(&line), "Dropping malformed stream record");
                }
                Ok(VerificationEvent::Started { batch_id }) => {
                    if run.tracker.on_started(&batch_id) {
                        let name = run.tracker.run().display_name.clone();
                        self.events.activity(format!(
                            "Started batch {} ({})",
                            name.as_deref().unwrap_or("unnamed"),
                            batch_id
                        ));
                        self.events.emit(RunEvent::Started { batch_id, name });
                        self.events.emit(RunEvent::Progress(run.tracker.snapshot()));
                    }
                }
                Ok(VerificationEvent::Result(record)) => {
                    if run.tracker.on_result(&record) {
                        counted += 1;
                        let snapshot = run.tracker.snapshot();
                        let last = snapshot.run.processed == snapshot.run.total;
                        if counted % self.log_every == 0 || last {
                            self.events.activity(format!(
                                "Verified {}/{}: {} is {}",
                                snapshot.run.processed,
                                snapshot.run.total,
                                record.email,
                                record.category
                            ));
                        }
                        self.events.emit(RunEvent::Progress(snapshot));
                    }
                }
                Ok(VerificationEvent::Completed { batch_id, totals }) => {
                    let current = run.tracker.run();
                    if current.id != batch_id && !current.has_placeholder_id() {
                        warn!(
                            run = %current.id,
                            batch_id = %batch_id,
                            "Completion for a different batch id"
                        );
                    }
                    if run.tracker.on_completed(totals.as_ref()) {
                        self.mark_completed(&mut run);
                        drain_until = Some(Instant::now() + COMPLETION_GRACE);
                    }
                }
            }
        }

        if run.machine.state() == RunState::Completed {
            self.refresh_after_completion().await;
            return run.tracker.snapshot();
        }
        self.fail(run, "stream closed before completion")
    }

    /// Follow an existing batch by polling its status
    pub async fn watch(&self, batch_id: &str, cancel: &CancellationToken) -> RunSnapshot {
        let tracker = AggregateTracker::resume(batch_id, Arc::clone(&self.names));
        let mut run = self.begin_run(tracker);
        run.machine.transition(RunState::Polling);
        self.events.activity(format!("Watching batch {}", batch_id));

        let mut updates = run.tracker.subscribe();
        let bus = self.events.clone();
        let forward = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.run.status.is_terminal() {
                    bus.emit(RunEvent::Progress(snapshot));
                }
            }
        });

        let poller = PollReconciler::new(Arc::clone(&self.status), self.poll_interval);
        let status = poller.run(&mut run.tracker, cancel).await;
        forward.abort();

        match status {
            BatchStatus::Completed => {
                self.mark_completed(&mut run);
                self.refresh_after_completion().await;
                run.tracker.snapshot()
            }
            _ => {
                let reason = run
                    .tracker
                    .run()
                    .failure
                    .clone()
                    .unwrap_or_else(|| CANCELLED.to_string());
                self.fail(run, reason)
            }
        }
    }

    fn mark_completed(&self, run: &mut ActiveRun) {
        run.machine.transition(RunState::Completed);
        let snapshot = run.tracker.snapshot();
        self.events.activity(format!(
            "Batch {} completed: {} valid, {} invalid, {} risky",
            snapshot.id(),
            snapshot.run.valid,
            snapshot.run.invalid,
            snapshot.run.risky
        ));
        self.events.emit(RunEvent::Completed(snapshot));
    }

    fn fail(&self, mut run: ActiveRun, reason: impl Into<String>) -> RunSnapshot {
        let reason = reason.into();
        run.tracker.on_failed(reason.clone());
        run.machine.transition(RunState::Failed);

        let snapshot = run.tracker.snapshot();
        let reason = snapshot.run.failure.clone().unwrap_or(reason);
        self.events.activity(format!("Batch {} failed: {}", snapshot.id(), reason));
        self.events.emit(RunEvent::Failed {
            snapshot: snapshot.clone(),
            reason,
        });
        snapshot
    }

    /// Refresh listings and statistics; failures are logged, not returned
    async fn refresh_after_completion(&self) {
        if let Err(e) = self.refresh_listings().await {
            warn!(error = %e, "Batch listing refresh failed");
        }
        if let Err(e) = self.refresh_statistics().await {
            warn!(error = %e, "Statistics refresh failed");
        }
    }

    /// Rebuild the batch listing from the service
    ///
    /// Every listed id without a name gets a generated one in a single
    /// directory write. Status snapshots are fetched concurrently; a batch
    /// whose snapshot cannot be fetched is logged and left out.
    pub async fn refresh_listings(&self) -> Result<BatchListing> {
        let index = self.client.list_batches().await?;
        debug!(count = index.batch_ids.len(), "Refreshing batch listing");

        match self.names.ensure_names(&index.batch_ids) {
            Ok(0) => {}
            Ok(assigned) => debug!(assigned, "Named new batches"),
            Err(e) => warn!(error = %e, "Could not record generated batch names"),
        }
        let names = self.names.entries().unwrap_or_default();

        let fetches = index.batch_ids.iter().map(|id| {
            let status = Arc::clone(&self.status);
            async move { (id, status.fetch_status(id).await) }
        });

        let summaries = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(id, fetched)| match fetched {
                Ok(snapshot) => {
                    let name = names.get(id).cloned().unwrap_or_else(|| id.clone());
                    Some(BatchSummary::from_snapshot(id, name, &snapshot))
                }
                Err(e) => {
                    warn!(batch_id = %id, error = %e, "Skipping batch without status");
                    None
                }
            });

        let listing = BatchListing::from_summaries(summaries);
        self.events.emit(RunEvent::ListingsRefreshed(listing.clone()));
        Ok(listing)
    }

    /// Fetch lifetime category statistics
    pub async fn refresh_statistics(&self) -> Result<CategoryStats> {
        let stats = self.client.category_stats().await?;
        self.events.emit(RunEvent::StatisticsRefreshed(stats.clone()));
        Ok(stats)
    }
}

fn excerpt(line: &str) -> &str {
    match line.char_indices().nth(LOG_EXCERPT_LEN) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
