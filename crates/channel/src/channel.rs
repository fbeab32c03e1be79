use async_trait::async_trait;
use jit_kitchen_types::OrderNotification;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// Publish capability handed to the decision engine.
///
/// Notifications are scoped to the order id carried inside them; how
/// listeners attach (websocket rooms, message topics) is the transport's
/// business, not the engine's.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, note: &OrderNotification) -> Result<(), ChannelError>;
}

/// Recording channel for tests: remembers everything published
#[derive(Default)]
pub struct RecordingChannel {
    published: Arc<RwLock<Vec<OrderNotification>>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order
    pub async fn published(&self) -> Vec<OrderNotification> {
        self.published.read().await.clone()
    }

    /// Number of `prep_started` notifications published so far
    pub async fn prep_started_count(&self) -> usize {
        self.published
            .read()
            .await
            .iter()
            .filter(|n| matches!(n, OrderNotification::PrepStarted { .. }))
            .count()
    }

    /// Number of `eta_update` notifications published so far
    pub async fn eta_update_count(&self) -> usize {
        self.published
            .read()
            .await
            .iter()
            .filter(|n| matches!(n, OrderNotification::EtaUpdate { .. }))
            .count()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn publish(&self, note: &OrderNotification) -> Result<(), ChannelError> {
        self.published.write().await.push(note.clone());
        Ok(())
    }
}
