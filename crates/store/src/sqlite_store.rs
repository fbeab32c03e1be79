use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jit_kitchen_types::{GeoPoint, Order, OrderStatus, ShopLocation};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::store::{OrderStore, StoreError};

// ═══════════════════════════════════════════════════════════════════════════
// SQLITE STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

/// Durable order store backed by SQLite.
///
/// The throttle claim and the prep trigger are single conditional UPDATE
/// statements; the database serializes them, so two racing samples for the
/// same order can never both observe `rows_affected == 1`.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given database path
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// Pinned to a single connection so every query sees the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(include_str!("../migrations/001_create_orders.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        sqlx::query(include_str!("../migrations/002_create_status_index.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::debug!("order store migrations applied");
        Ok(())
    }

    fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StoreError> {
        let status_str: String = row.get("status");
        let status: OrderStatus = status_str
            .parse()
            .map_err(|_| StoreError::SerializationError(format!("bad status: {status_str}")))?;

        let coords = GeoPoint::new(row.get("shop_lat"), row.get("shop_lng"))
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let last_provider_check = row
            .get::<Option<i64>, _>("last_provider_check")
            .map(|ms| millis_to_utc(ms))
            .transpose()?;

        Ok(Order {
            id: row.get("id"),
            customer_name: row.get("customer_name"),
            shop_location: ShopLocation {
                coords,
                address: row.get("shop_address"),
            },
            prep_time_minutes: row.get::<i64, _>("prep_time_minutes") as u32,
            status,
            last_provider_check,
            created_at: millis_to_utc(row.get("created_at"))?,
        })
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::SerializationError(format!("bad timestamp: {ms}")))
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_name, shop_lat, shop_lng, shop_address,
                prep_time_minutes, status, last_provider_check, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(order.shop_location.coords.lat)
        .bind(order.shop_location.coords.lng)
        .bind(&order.shop_location.address)
        .bind(order.prep_time_minutes as i64)
        .bind(order.status.as_str())
        .bind(order.last_provider_check.map(|t| t.timestamp_millis()))
        .bind(order.created_at.timestamp_millis())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateId(order.id.clone()))
            }
            Err(e) => Err(StoreError::DatabaseError(e.to_string())),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    async fn claim_throttle_slot(
        &self,
        id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool, StoreError> {
        // Compare-and-set: the WHERE clause re-checks status and cooldown so
        // the read and the write cannot be split by a concurrent claimer.
        let threshold = (now - cooldown).timestamp_millis();

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET last_provider_check = ?
            WHERE id = ?
              AND status = 'TRACKING'
              AND (last_provider_check IS NULL OR last_provider_check <= ?)
            "#,
        )
        .bind(now.timestamp_millis())
        .bind(id)
        .bind(threshold)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish a lost claim from a missing order
        match self.get(id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn trigger_preparing(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'PREPARING' WHERE id = ? AND status = 'TRACKING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match self.get(id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn advance_status(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        if !from.can_advance_to(to) {
            return Ok(false);
        }

        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match self.get(id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE status = ? ORDER BY created_at ASC LIMIT ?",
        )
        .bind(status.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_order).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
