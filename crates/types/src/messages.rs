use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{GeoError, GeoPoint};

/// Ingress validation errors
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("order id cannot be empty")]
    MissingOrderId,

    #[error("invalid position: {0}")]
    InvalidPosition(#[from] GeoError),
}

/// A raw position sample from the traveling party.
///
/// This is the fixed wire schema for the `update_location` ingress event.
/// Payloads are validated here, before anything reaches the decision logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub order_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Optional speed in m/s, as reported by the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl LocationUpdate {
    pub fn new(order_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            order_id: order_id.into(),
            latitude,
            longitude,
            speed: None,
        }
    }

    /// Validate the sample and return its position
    pub fn position(&self) -> Result<GeoPoint, MessageError> {
        if self.order_id.trim().is_empty() {
            return Err(MessageError::MissingOrderId);
        }
        Ok(GeoPoint::new(self.latitude, self.longitude)?)
    }
}

/// Notification published to an order's channel by the decision engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderNotification {
    /// Emitted exactly once per order, on the winning trigger
    PrepStarted { order_id: String, message: String },

    /// Emitted on every non-triggering processed sample; minutes
    EtaUpdate {
        order_id: String,
        eta: i64,
        slack: i64,
    },
}

impl OrderNotification {
    pub fn order_id(&self) -> &str {
        match self {
            OrderNotification::PrepStarted { order_id, .. } => order_id,
            OrderNotification::EtaUpdate { order_id, .. } => order_id,
        }
    }
}
