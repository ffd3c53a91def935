//! Event bus contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::events::OrderLifecycleEvent;

/// Publish failure. The coordinator logs these and never propagates
/// them as operation failures.
#[derive(Debug, Error)]
#[error("event publish failed: {reason}")]
pub struct PublishError {
    pub reason: String,
}

impl PublishError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Fire-and-forget broadcast of order lifecycle transitions.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event on its channel.
    async fn publish(&self, event: &OrderLifecycleEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Default)]
struct PublisherState {
    events: Vec<OrderLifecycleEvent>,
    fail_on_publish: bool,
}

/// In-memory event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<PublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates an event publisher with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures publish calls to fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    /// Returns every published event in order.
    pub fn published(&self) -> Vec<OrderLifecycleEvent> {
        self.state.read().unwrap().events.clone()
    }

    /// Returns the channels published so far, in order.
    pub fn channels(&self) -> Vec<&'static str> {
        self.state
            .read()
            .unwrap()
            .events
            .iter()
            .map(|e| e.channel())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &OrderLifecycleEvent) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(PublishError::new("bus unavailable"));
        }
        state.events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use chrono::Utc;

    #[tokio::test]
    async fn records_published_events() {
        let publisher = InMemoryEventPublisher::new();
        let event = OrderLifecycleEvent::OrderPaid {
            order_id: OrderId::new(),
            payment_id: "PAY-0001".to_string(),
            occurred_at: Utc::now(),
        };

        publisher.publish(&event).await.unwrap();
        assert_eq!(publisher.published(), vec![event]);
        assert_eq!(publisher.channels(), vec!["orders.paid"]);
    }

    #[tokio::test]
    async fn publish_failure_is_reported() {
        let publisher = InMemoryEventPublisher::new();
        publisher.set_fail_on_publish(true);

        let event = OrderLifecycleEvent::OrderPaid {
            order_id: OrderId::new(),
            payment_id: "PAY-0001".to_string(),
            occurred_at: Utc::now(),
        };
        assert!(publisher.publish(&event).await.is_err());
        assert!(publisher.published().is_empty());
    }
}
