use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jit_kitchen_types::{Order, OrderStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order not found: {0}")]
    NotFound(String),

    #[error("duplicate order ID: {0}")]
    DuplicateId(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Order storage - can be implemented for different backends.
///
/// `claim_throttle_slot` and `trigger_preparing` are the only two mutations
/// the decision engine performs, and both must be atomic conditional updates:
/// when several samples for the same order race, at most one caller may
/// observe success. Implementations serialize these per order (a lock
/// section, a conditional UPDATE, or equivalent); the engine itself holds no
/// locks.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store a new order
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    /// Get an order by ID
    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Atomically claim the provider throttle slot for an order.
    ///
    /// Succeeds iff the order is `Tracking` and its last claim is absent or
    /// at least `cooldown` old; on success `last_provider_check` is set to
    /// `now` before this returns.
    async fn claim_throttle_slot(
        &self,
        id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool, StoreError>;

    /// Atomically flip `Tracking` → `Preparing`.
    ///
    /// Returns true only for the one caller that wins; false means another
    /// caller already transitioned the order.
    async fn trigger_preparing(&self, id: &str) -> Result<bool, StoreError>;

    /// Conditionally advance the post-trigger lifecycle (`from` → `to`).
    ///
    /// Compare-and-set on the current status so concurrent kitchen/pickup
    /// actors cannot clobber each other; `to` must be further along than
    /// `from`. Returns false when the order was not in `from`.
    async fn advance_status(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError>;

    /// List orders by status, oldest first
    async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════

/// HashMap-backed store for tests and local runs.
///
/// The single `RwLock` write section around each conditional mutator is what
/// makes the claim and the trigger atomic here.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored orders (for testing)
    pub fn len(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// Check if store is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.orders.read().unwrap().is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().unwrap();
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateId(order.id.clone()));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().unwrap().get(id).cloned())
    }

    async fn claim_throttle_slot(
        &self,
        id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Ok(order.claim_throttle_slot(now, cooldown))
    }

    async fn trigger_preparing(&self, id: &str) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Ok(order.trigger_preparing())
    }

    async fn advance_status(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if order.status != from || !from.can_advance_to(to) {
            return Ok(false);
        }
        order.status = to;
        Ok(true)
    }

    async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut results: Vec<_> = orders
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();

        results.sort_by_key(|o| o.created_at);
        results.truncate(limit);
        Ok(results)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
