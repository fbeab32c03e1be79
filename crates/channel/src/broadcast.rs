use async_trait::async_trait;
use jit_kitchen_types::OrderNotification;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::channel::{ChannelError, NotificationChannel};

/// Default per-topic buffer capacity
pub const DEFAULT_CAPACITY: usize = 64;

/// Per-order publish/subscribe hub.
///
/// Each order id gets its own broadcast topic; `subscribe` is the listener's
/// "join" step. Publishing to an order nobody is watching succeeds and drops
/// the message, matching room semantics: the engine never cares whether a
/// dashboard is currently attached.
pub struct BroadcastHub {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<OrderNotification>>>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Join an order's topic. Creates the topic on first subscribe; leaving
    /// is just dropping the receiver.
    pub async fn subscribe(&self, order_id: &str) -> broadcast::Receiver<OrderNotification> {
        let mut topics = self.topics.write().await;
        topics
            .entry(order_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live topics (for testing)
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }

    /// Drop topics whose last listener has left
    pub async fn prune(&self) {
        let mut topics = self.topics.write().await;
        topics.retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationChannel for BroadcastHub {
    async fn publish(&self, note: &OrderNotification) -> Result<(), ChannelError> {
        let topics = self.topics.read().await;

        if let Some(sender) = topics.get(note.order_id()) {
            // send only errors when no receiver is listening, which is fine
            if sender.send(note.clone()).is_ok() {
                tracing::debug!(order_id = %note.order_id(), "published notification");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eta_note(order_id: &str, eta: i64) -> OrderNotification {
        OrderNotification::EtaUpdate {
            order_id: order_id.into(),
            eta,
            slack: eta - 10,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_publish() {
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe("o-1").await;

        hub.publish(&eta_note("o-1", 20)).await.unwrap();

        let note = rx.recv().await.unwrap();
        assert_eq!(note, eta_note("o-1", 20));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let hub = BroadcastHub::new();
        assert!(hub.publish(&eta_note("o-1", 20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_topics_are_isolated_per_order() {
        let hub = BroadcastHub::new();
        let mut rx_a = hub.subscribe("order-a").await;
        let mut rx_b = hub.subscribe("order-b").await;

        hub.publish(&eta_note("order-a", 15)).await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap(), eta_note("order-a", 15));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_all_subscribers_of_topic_receive() {
        let hub = BroadcastHub::new();
        let mut rx1 = hub.subscribe("o-1").await;
        let mut rx2 = hub.subscribe("o-1").await;

        hub.publish(&eta_note("o-1", 8)).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap(), eta_note("o-1", 8));
        assert_eq!(rx2.recv().await.unwrap(), eta_note("o-1", 8));
    }

    #[tokio::test]
    async fn test_prune_drops_abandoned_topics() {
        let hub = BroadcastHub::new();

        {
            let _rx = hub.subscribe("o-1").await;
            assert_eq!(hub.topic_count().await, 1);
        }

        hub.prune().await;
        assert_eq!(hub.topic_count().await, 0);
    }
}
