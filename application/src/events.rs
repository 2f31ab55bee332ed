//! Event channel between the pipeline and its observers.
//!
//! The orchestrator, router and session manager publish [`PipelineEvent`]s;
//! the CLI progress display and the JSONL event log subscribe. Every
//! subscriber gets its own unbounded channel and sees events in publication
//! order.

use aigenflow_domain::PipelineEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Cloneable publish/subscribe handle
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<PipelineEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber; closed ones are dropped.
    ///
    /// The lock is held across the whole fan-out so concurrent publishers
    /// never interleave differently for different subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<PipelineEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn saved(id: &str) -> PipelineEvent {
        PipelineEvent::StateSaved {
            session_id: id.to_string(),
            state: aigenflow_domain::PipelineState::Idle,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_every_subscriber_receives_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(saved("1"));
        bus.publish(saved("2"));

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.try_recv().unwrap().session_id(), Some("1"));
            assert_eq!(rx.try_recv().unwrap().session_id(), Some("2"));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let _keep = bus.subscribe();
        drop(rx);

        bus.publish(saved("x"));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(saved("x"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
