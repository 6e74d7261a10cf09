//! Run lifecycle events
//!
//! A [`RunEvent`] is published for every state change of a run, every
//! counted result and every listing or statistics refresh. Consumers
//! subscribe through [`EventBus`]; a slow subscriber lags and loses the
//! oldest events rather than blocking the pipeline.

use super::listing::BatchListing;
use super::RunState;
use crate::api::CategoryStats;
use crate::tracker::RunSnapshot;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Default number of buffered events per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// One line of the human-readable activity log
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl Activity {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunEvent {
    StateChanged { from: RunState, to: RunState },
    Started { batch_id: String, name: Option<String> },
    Progress(RunSnapshot),
    Activity(Activity),
    Completed(RunSnapshot),
    Failed { snapshot: RunSnapshot, reason: String },
    ListingsRefreshed(BatchListing),
    StatisticsRefreshed(CategoryStats),
}

impl RunEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RunEvent::StateChanged { .. } => "StateChanged",
            RunEvent::Started { .. } => "Started",
            RunEvent::Progress(_) => "Progress",
            RunEvent::Activity(_) => "Activity",
            RunEvent::Completed(_) => "Completed",
            RunEvent::Failed { .. } => "Failed",
            RunEvent::ListingsRefreshed(_) => "ListingsRefreshed",
            RunEvent::StatisticsRefreshed(_) => "StatisticsRefreshed",
        }
    }
}

/// Broadcast channel for [`RunEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscriber is not an error
    pub fn emit(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }

    pub fn activity(&self, message: impl Into<String>) {
        self.emit(RunEvent::Activity(Activity::now(message)));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.activity("nobody listens");
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.activity("hello");

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                RunEvent::Activity(a) => assert_eq!(a.message, "hello"),
                other => panic!("unexpected event {}", other.event_type()),
            }
        }
    }
}
