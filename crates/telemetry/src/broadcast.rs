//! Broadcast fan-out sink.
//!
//! Uses `tokio::sync::broadcast` so any number of live subscribers (a
//! dashboard, a log shipper) can observe trace events without coupling to
//! the runner. No subscribers is fine; slow subscribers lose old events
//! rather than blocking the run.

use std::sync::Arc;

use baton_core::trace::{TraceEvent, TraceSink};
use tokio::sync::broadcast;

pub struct BroadcastSink {
    sender: broadcast::Sender<Arc<TraceEvent>>,
}

impl BroadcastSink {
    /// Create a sink with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TraceEvent>> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TraceSink for BroadcastSink {
    fn record(&self, event: &TraceEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(Arc::new(event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let sink = BroadcastSink::default();
        let mut rx = sink.subscribe();

        sink.record(&TraceEvent::RunStarted {
            run_id: Uuid::new_v4(),
            agent: "triage".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event.as_ref(), TraceEvent::RunStarted { agent, .. } if agent == "triage"));
    }

    #[test]
    fn recording_without_subscribers_is_fine() {
        let sink = BroadcastSink::new(8);
        assert_eq!(sink.subscriber_count(), 0);
        sink.record(&TraceEvent::RunStarted {
            run_id: Uuid::new_v4(),
            agent: "triage".into(),
            timestamp: Utc::now(),
        });
    }
}
