use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::geo::{GeoError, ShopLocation};

// ═══════════════════════════════════════════════════════════════════════════
// ORDER STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════

/// Lifecycle of a delivery/pickup order.
///
/// The status only ever moves forward:
/// `Tracking` (driver moving, engine computing ETA) → `Preparing` (slack
/// collapsed, kitchen cooking) → `Ready` (cooking finished) → `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Tracking,
    Preparing,
    Ready,
    Completed,
}

impl OrderStatus {
    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Tracking => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Completed => 3,
        }
    }

    /// True if `next` is strictly further along the lifecycle
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Tracking => "TRACKING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRACKING" => Ok(OrderStatus::Tracking),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "READY" => Ok(OrderStatus::Ready),
            "COMPLETED" => Ok(OrderStatus::Completed),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Order business rule errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("prep time must be greater than zero")]
    InvalidPrepTime,

    #[error("customer name cannot be empty")]
    EmptyCustomerName,

    #[error("invalid shop location: {0}")]
    InvalidLocation(#[from] GeoError),

    #[error("cannot transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

// ═══════════════════════════════════════════════════════════════════════════
// ORDER ENTITY
// ═══════════════════════════════════════════════════════════════════════════

/// One delivery/pickup job.
///
/// `id`, `customer_name`, `shop_location`, `prep_time_minutes` and
/// `created_at` are immutable after creation. `status` and
/// `last_provider_check` change only through the conditional writers below,
/// which encode the invariants the decision engine relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub shop_location: ShopLocation,
    /// Minutes of kitchen preparation this order needs
    pub prep_time_minutes: u32,
    pub status: OrderStatus,
    /// Timestamp of the last successful throttle claim, non-decreasing
    pub last_provider_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order in `Tracking` state with a fresh id
    pub fn new(
        customer_name: impl Into<String>,
        shop_location: ShopLocation,
        prep_time_minutes: u32,
    ) -> Result<Self, OrderError> {
        let customer_name = customer_name.into();
        if customer_name.trim().is_empty() {
            return Err(OrderError::EmptyCustomerName);
        }
        if prep_time_minutes == 0 {
            return Err(OrderError::InvalidPrepTime);
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            customer_name,
            shop_location,
            prep_time_minutes,
            status: OrderStatus::Tracking,
            last_provider_check: None,
            created_at: Utc::now(),
        })
    }

    /// Claim the throttle slot for an external provider call.
    ///
    /// Succeeds and records `now` iff the order is still `Tracking` and the
    /// previous claim is either absent or at least `cooldown` old. Callers
    /// must invoke this inside whatever critical section their store
    /// provides; the method itself is a pure conditional state update.
    pub fn claim_throttle_slot(&mut self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        if self.status != OrderStatus::Tracking {
            return false;
        }

        match self.last_provider_check {
            Some(last) if now.signed_duration_since(last) < cooldown => false,
            _ => {
                self.last_provider_check = Some(now);
                true
            }
        }
    }

    /// One-shot transition to `Preparing`.
    ///
    /// Returns true only for the caller that actually flips the status;
    /// every later caller gets false and must not act on the order again.
    pub fn trigger_preparing(&mut self) -> bool {
        if self.status == OrderStatus::Tracking {
            self.status = OrderStatus::Preparing;
            true
        } else {
            false
        }
    }

    /// Forward-only transition for the post-trigger lifecycle steps
    pub fn advance(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_advance_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
