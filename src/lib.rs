//! jit-kitchen: just-in-time kitchen prep triggered by live arrival tracking.
//!
//! The decision engine watches a stream of position samples for an in-transit
//! order, asks a traffic-aware routing provider for the remaining travel time
//! to the shop, and fires the kitchen exactly when the remaining slack
//! collapses to the configured buffer. This crate wires the capability crates
//! together; the interesting invariants live in `jit-kitchen-engine` and
//! `jit-kitchen-store`.

use anyhow::Context as _;
use chrono::Duration;
use std::sync::Arc;

use jit_kitchen_channel::BroadcastHub;
use jit_kitchen_config::{validate_config, AppConfig};
use jit_kitchen_engine::{Decision, EngineConfig, EngineError, TrackingEngine};
use jit_kitchen_provider::DistanceMatrixProvider;
use jit_kitchen_store::{InMemoryStore, OrderStore, SqliteStore};
use jit_kitchen_types::{LocationUpdate, Order, ShopLocation};

pub use jit_kitchen_channel as channel;
pub use jit_kitchen_config as config;
pub use jit_kitchen_engine as engine;
pub use jit_kitchen_metrics as metrics;
pub use jit_kitchen_provider as provider;
pub use jit_kitchen_store as store;
pub use jit_kitchen_types as types;

/// A fully wired tracking service
pub struct ServiceContext {
    pub store: Arc<dyn OrderStore>,
    pub hub: Arc<BroadcastHub>,
    pub engine: Arc<TrackingEngine>,
    pub config: AppConfig,
}

impl ServiceContext {
    /// Build the service from validated configuration.
    ///
    /// The provider API key is read from the environment variable named in
    /// `provider.api_key_env`, never from the config file itself.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        validate_config(&config)?;

        let store: Arc<dyn OrderStore> = if config.store.in_memory {
            Arc::new(InMemoryStore::new())
        } else {
            Arc::new(SqliteStore::new(&config.store.database_path).await?)
        };

        let api_key = std::env::var(&config.provider.api_key_env).with_context(|| {
            format!(
                "missing provider API key in ${}",
                config.provider.api_key_env
            )
        })?;

        let eta_provider = Arc::new(
            DistanceMatrixProvider::new(config.provider.endpoint.clone(), api_key).with_timeout(
                std::time::Duration::from_millis(config.provider.timeout_ms),
            ),
        );

        let hub = Arc::new(BroadcastHub::with_capacity(config.channel.capacity));

        let engine_config = EngineConfig::default()
            .with_cooldown(Duration::seconds(config.engine.cooldown_secs as i64))
            .with_slack_buffer_minutes(config.engine.slack_buffer_minutes)
            .with_prefilter_radius_meters(config.engine.prefilter_radius_meters);

        let engine = Arc::new(TrackingEngine::new(
            store.clone(),
            eta_provider,
            hub.clone(),
            engine_config,
        ));

        Ok(Self {
            store,
            hub,
            engine,
            config,
        })
    }

    /// Create an order in `TRACKING` state.
    ///
    /// Order creation proper belongs to the intake API in front of this
    /// service; this mirrors its contract for demos and tests.
    pub async fn create_order(
        &self,
        customer_name: &str,
        shop_location: ShopLocation,
        prep_time_minutes: u32,
    ) -> anyhow::Result<Order> {
        let order = Order::new(customer_name, shop_location, prep_time_minutes)?;
        self.store.create(&order).await?;
        tracing::info!(order_id = %order.id, customer = customer_name, "order created");
        Ok(order)
    }

    /// Process one position sample and record it in the metrics registry
    pub async fn handle_update(&self, update: &LocationUpdate) -> Result<Decision, EngineError> {
        jit_kitchen_metrics::SAMPLES_RECEIVED.inc();
        let decision = self.engine.process_update(update).await?;
        jit_kitchen_metrics::record_decision(decision.label());
        Ok(decision)
    }
}
