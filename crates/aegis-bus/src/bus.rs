//! [`MessageBus`] contract plus an in-memory reference adapter used by
//! tests and local composition.

use crate::events::{BusEvent, Headers};
use aegis_types::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A single published message, as delivered to subscribers.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Topic the message was published onto.
    pub topic: String,
    /// Typed event payload.
    pub event: BusEvent,
    /// Headers attached at publish time.
    pub headers: Headers,
}

/// Publish-side contract for the message bus. Batched writes are
/// best-effort atomic per underlying vendor: the in-memory adapter below
/// publishes the whole batch or none of it, but a real Kafka/SQS adapter
/// may only guarantee per-partition ordering, not batch atomicity.
#[async_trait]
pub trait MessageBusProducer: Send + Sync {
    /// Publish a single event with headers, retrying transient failures
    /// with the same backoff schedule a real vendor client would apply.
    async fn publish(&self, event: BusEvent, headers: Headers) -> Result<()>;

    /// Publish a batch of events, in order, onto their respective topics.
    async fn publish_batch(&self, events: Vec<(BusEvent, Headers)>) -> Result<()>;
}

/// Subscribe-side contract: a consumer drains deliveries for one topic.
#[async_trait]
pub trait MessageBusConsumer: Send + Sync {
    /// Fetch up to `max` undelivered messages for `topic`, oldest first,
    /// marking them delivered.
    async fn poll(&self, topic: &str, max: usize) -> Result<Vec<Delivery>>;
}

/// In-memory [`MessageBusProducer`]/[`MessageBusConsumer`] that queues
/// deliveries per topic. Retries are simulated via an injectable failure
/// count so tests can exercise the retry-on-transient-error path without a
/// real broker.
pub struct InMemoryMessageBus {
    queues: RwLock<HashMap<String, Vec<Delivery>>>,
    /// Number of subsequent `publish` calls that should fail with a
    /// transient error before succeeding, used by tests.
    inject_failures: RwLock<u32>,
    max_retries: u32,
}

impl InMemoryMessageBus {
    /// Construct an empty bus with the given retry budget for transient
    /// publish failures.
    pub fn new(max_retries: u32) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            inject_failures: RwLock::new(0),
            max_retries,
        }
    }

    /// Arrange for the next `count` publish attempts to fail with a
    /// transient error, exercising the retry path.
    pub async fn inject_transient_failures(&self, count: u32) {
        *self.inject_failures.write().await = count;
    }

    async fn try_publish_once(&self, event: &BusEvent, headers: &Headers) -> Result<()> {
        let mut inject = self.inject_failures.write().await;
        if *inject > 0 {
            *inject -= 1;
            return Err(Error::Transient("simulated bus unavailable".to_string()));
        }
        drop(inject);

        let delivery = Delivery {
            topic: event.topic().to_string(),
            event: event.clone(),
            headers: headers.clone(),
        };
        let mut queues = self.queues.write().await;
        queues.entry(delivery.topic.clone()).or_default().push(delivery);
        Ok(())
    }

    async fn publish_with_retry(&self, event: &BusEvent, headers: &Headers) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.try_publish_once(event, headers).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay_ms = 50u64 * (1u64 << attempt.min(6));
                    warn!(
                        topic = event.topic(),
                        attempt, delay_ms, "bus publish failed transiently, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Snapshot every delivery ever queued on `topic`, for test assertions.
    pub async fn deliveries(&self, topic: &str) -> Vec<Delivery> {
        self.queues.read().await.get(topic).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl MessageBusProducer for InMemoryMessageBus {
    async fn publish(&self, event: BusEvent, headers: Headers) -> Result<()> {
        debug!(topic = event.topic(), "publishing bus event");
        self.publish_with_retry(&event, &headers).await
    }

    async fn publish_batch(&self, events: Vec<(BusEvent, Headers)>) -> Result<()> {
        for (event, headers) in &events {
            self.publish_with_retry(event, headers).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBusConsumer for InMemoryMessageBus {
    async fn poll(&self, topic: &str, max: usize) -> Result<Vec<Delivery>> {
        let mut queues = self.queues.write().await;
        let Some(queue) = queues.get_mut(topic) else {
            return Ok(Vec::new());
        };
        let take = max.min(queue.len());
        Ok(queue.drain(0..take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TransactionFlowEvent;
    use chrono::Utc;

    fn sample_event() -> BusEvent {
        BusEvent::TransactionFlow(TransactionFlowEvent {
            transaction_id: "t1".into(),
            from_entity: "e1".into(),
            to_entity: "e2".into(),
            amount: 9500.0,
            currency: "USD".into(),
            risk_level: "medium".into(),
            risk_score: 55.0,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn publish_then_poll_round_trips_fields() {
        let bus = InMemoryMessageBus::new(3);
        let headers = crate::events::transaction_flow_headers();
        bus.publish(sample_event(), headers.clone()).await.unwrap();

        let delivered = bus.poll("transaction_flow", 10).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].headers, headers);
        match &delivered[0].event {
            BusEvent::TransactionFlow(t) => assert_eq!(t.transaction_id, "t1"),
            _ => panic!("wrong event variant"),
        }
    }

    #[tokio::test]
    async fn poll_drains_messages_so_they_are_not_redelivered() {
        let bus = InMemoryMessageBus::new(3);
        bus.publish(sample_event(), Headers::new()).await.unwrap();
        assert_eq!(bus.poll("transaction_flow", 10).await.unwrap().len(), 1);
        assert_eq!(bus.poll("transaction_flow", 10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let bus = InMemoryMessageBus::new(5);
        bus.inject_transient_failures(2).await;
        bus.publish(sample_event(), Headers::new()).await.unwrap();
        assert_eq!(bus.deliveries("transaction_flow").await.len(), 1);
    }

    #[tokio::test]
    async fn exhausting_retry_budget_surfaces_the_error() {
        let bus = InMemoryMessageBus::new(1);
        bus.inject_transient_failures(5).await;
        let err = bus.publish(sample_event(), Headers::new()).await.unwrap_err();
        assert!(matches!(err, Error::Transient(_)));
    }

    #[tokio::test]
    async fn publish_batch_delivers_every_event_in_order() {
        let bus = InMemoryMessageBus::new(0);
        let events = vec![
            (sample_event(), Headers::new()),
            (sample_event(), Headers::new()),
        ];
        bus.publish_batch(events).await.unwrap();
        assert_eq!(bus.deliveries("transaction_flow").await.len(), 2);
    }
}
