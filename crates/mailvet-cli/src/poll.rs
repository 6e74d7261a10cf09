//! Polling reconciler
//!
//! Fetches status snapshots of a known batch at a fixed interval and folds
//! them into its [`AggregateTracker`] until the batch completes, fails, or
//! the caller cancels. Failed fetches are logged and retried on the next
//! tick.

use crate::api::StatusSource;
use crate::tracker::AggregateTracker;
use mailvet_common::BatchStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Failure reason recorded when the caller stops a run
pub const CANCELLED: &str = "cancelled";

pub struct PollReconciler {
    source: Arc<dyn StatusSource>,
    interval: Duration,
}

impl PollReconciler {
    pub fn new(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Poll until the tracked run reaches a terminal status
    ///
    /// Cancellation is observed while a fetch is in flight and while waiting
    /// for the next tick. No fetch is issued after it.
    pub async fn run(
        &self,
        tracker: &mut AggregateTracker,
        cancel: &CancellationToken,
    ) -> BatchStatus {
        let batch_id = tracker.run().id.clone();
        let mut attempt: u64 = 0;

        loop {
            if tracker.run().status.is_terminal() {
                return tracker.run().status;
            }

            attempt += 1;
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracker.on_failed(CANCELLED);
                    return tracker.run().status;
                }
                fetched = self.source.fetch_status(&batch_id) => fetched,
            };

            match fetched {
                Ok(snapshot) => {
                    debug!(
                        batch_id = %batch_id,
                        attempt,
                        status = %snapshot.status,
                        verified = snapshot.verified_emails,
                        "Status snapshot"
                    );
                    tracker.apply_snapshot(&snapshot);
                    if tracker.run().status.is_terminal() {
                        return tracker.run().status;
                    }
                }
                Err(e) => {
                    warn!(
                        batch_id = %batch_id,
                        attempt,
                        error = %e,
                        "Status poll failed; retrying"
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracker.on_failed(CANCELLED);
                    return tracker.run().status;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, StatusSnapshot};
    use crate::error::{CliError, Result};
    use crate::names::NameDirectory;
    use async_trait::async_trait;
    use mailvet_common::CategoryTotals;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays a fixed script, repeating the last entry once exhausted
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<StatusSnapshot>>>,
        last: StatusSnapshot,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<StatusSnapshot>>, last: StatusSnapshot) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _job_id: &str) -> Result<StatusSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.last.clone()))
        }
    }

    fn snap(status: &str, valid: u64) -> StatusSnapshot {
        StatusSnapshot {
            job_id: "J1".to_string(),
            status: status.to_string(),
            total_emails: 10,
            verified_emails: valid,
            results: CategoryTotals::new(valid, 0, 0),
            timestamp: None,
        }
    }

    fn tracker() -> AggregateTracker {
        AggregateTracker::resume("J1", Arc::new(NameDirectory::in_memory()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_completed() {
        let source = ScriptedSource::new(
            vec![Ok(snap("running", 2)), Ok(snap("running", 5)), Ok(snap("running", 8))],
            snap("completed", 10),
        );
        let poller = PollReconciler::new(source.clone(), Duration::from_secs(3));
        let mut t = tracker();

        let status = poller.run(&mut t, &CancellationToken::new()).await;

        assert_eq!(status, BatchStatus::Completed);
        assert_eq!(source.calls(), 4);
        assert_eq!(t.snapshot().run.processed, 10);
        assert_eq!(t.snapshot().progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetches_are_retried() {
        let source = ScriptedSource::new(
            vec![
                Err(CliError::api("502 Bad Gateway")),
                Err(CliError::api("timeout")),
            ],
            snap("completed", 10),
        );
        let poller = PollReconciler::new(source.clone(), Duration::from_secs(3));
        let mut t = tracker();

        assert_eq!(poller.run(&mut t, &CancellationToken::new()).await, BatchStatus::Completed);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let source = ScriptedSource::new(vec![], snap("running", 1));
        let poller = PollReconciler::new(source.clone(), Duration::from_secs(3));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let mut t = tracker();
        let status = poller.run(&mut t, &cancel).await;

        assert_eq!(status, BatchStatus::Failed);
        assert_eq!(t.run().failure.as_deref(), Some(CANCELLED));
        // Ticks at 0s, 3s, 6s and 9s; the wait towards 12s is interrupted
        assert_eq!(source.calls(), 4);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_issues_no_fetch() {
        let source = ScriptedSource::new(vec![], snap("running", 1));
        let poller = PollReconciler::new(source.clone(), Duration::from_secs(3));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut t = tracker();
        assert_eq!(poller.run(&mut t, &cancel).await, BatchStatus::Failed);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_stops_polling() {
        let source = ScriptedSource::new(vec![Ok(snap("running", 1))], snap("error", 1));
        let poller = PollReconciler::new(source.clone(), Duration::from_secs(3));
        let mut t = tracker();

        assert_eq!(poller.run(&mut t, &CancellationToken::new()).await, BatchStatus::Failed);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_polls_http_status_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/verify/status/J1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "job_id": "J1",
                "status": "running",
                "total_emails": 4,
                "verified_emails": 1,
                "results": {"valid": 1, "invalid": 0, "risky": 0}
            })))
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/verify/status/J1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "job_id": "J1",
                "status": "completed",
                "total_emails": 4,
                "verified_emails": 4,
                "results": {"valid": 2, "invalid": 1, "risky": 0, "custom": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let poller = PollReconciler::new(Arc::new(client), Duration::from_millis(10));
        let mut t = tracker();

        assert_eq!(poller.run(&mut t, &CancellationToken::new()).await, BatchStatus::Completed);
        let s = t.snapshot();
        assert_eq!((s.run.valid, s.run.invalid, s.run.risky), (2, 1, 1));
    }
}
