use chrono::{DateTime, Duration, Utc};
use jit_kitchen_channel::NotificationChannel;
use jit_kitchen_provider::EtaProvider;
use jit_kitchen_store::OrderStore;
use jit_kitchen_types::{LocationUpdate, OrderNotification, OrderStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::decision::{Decision, IgnoreReason};
use crate::error::EngineError;

/// Tunables for the decision engine
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Minimum spacing between external provider calls per order
    pub cooldown: Duration,

    /// Trigger when `eta - prep_time <= slack_buffer_minutes` (inclusive)
    pub slack_buffer_minutes: i64,

    /// When set, samples further than this great-circle distance from the
    /// shop are skipped before the throttle slot is spent
    pub prefilter_radius_meters: Option<f64>,
}

impl EngineConfig {
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_slack_buffer_minutes(mut self, minutes: i64) -> Self {
        self.slack_buffer_minutes = minutes;
        self
    }

    pub fn with_prefilter_radius_meters(mut self, meters: Option<f64>) -> Self {
        self.prefilter_radius_meters = meters;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(60),
            slack_buffer_minutes: 1,
            prefilter_radius_meters: None,
        }
    }
}

/// The position-update decision engine.
///
/// Stateless over its three injected capabilities: all shared mutable state
/// lives in the order store, and the two operations that need atomicity (the
/// throttle claim and the prep trigger) are conditional updates there, so
/// any number of engine instances can process samples for the same order
/// concurrently.
pub struct TrackingEngine {
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn EtaProvider>,
    channel: Arc<dyn NotificationChannel>,
    config: EngineConfig,
}

impl TrackingEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        provider: Arc<dyn EtaProvider>,
        channel: Arc<dyn NotificationChannel>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            channel,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a position sample received now
    pub async fn process_update(&self, update: &LocationUpdate) -> Result<Decision, EngineError> {
        self.process_update_at(update, Utc::now()).await
    }

    /// Process a position sample with an explicit receipt timestamp.
    ///
    /// The timestamp drives the cooldown arithmetic, so replaying samples
    /// (or testing) with controlled clocks goes through here.
    pub async fn process_update_at(
        &self,
        update: &LocationUpdate,
        received_at: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        // 1. Validate the ingress payload before touching any state.
        let position = match update.position() {
            Ok(position) => position,
            Err(e) => {
                warn!(order_id = %update.order_id, error = %e, "rejected position sample");
                return Ok(Decision::Rejected {
                    reason: e.to_string(),
                });
            }
        };

        // 2. Load the order. Unknown ids and finished orders are expected
        // traffic (late samples, retries), not errors.
        let order = match self.store.get(&update.order_id).await? {
            Some(order) => order,
            None => {
                debug!(order_id = %update.order_id, "sample for unknown order ignored");
                return Ok(Decision::Ignored(IgnoreReason::OrderNotFound));
            }
        };

        if order.status != OrderStatus::Tracking {
            debug!(
                order_id = %order.id,
                status = order.status.as_str(),
                "sample for non-tracking order ignored"
            );
            return Ok(Decision::Ignored(IgnoreReason::NotTracking));
        }

        // 3. Optional geometric prefilter, before the throttle claim: an
        // obviously-far sample should spend neither provider quota nor the
        // cooldown slot.
        if let Some(radius) = self.config.prefilter_radius_meters {
            let distance_meters = position.distance_meters(&order.shop_location.coords);
            if distance_meters > radius {
                debug!(
                    order_id = %order.id,
                    distance_meters,
                    radius,
                    "sample beyond prefilter radius"
                );
                return Ok(Decision::Prefiltered { distance_meters });
            }
        }

        // 4. Claim the throttle slot. The store makes this atomic, so dense
        // sample bursts cost at most one provider call per cooldown window.
        if !self
            .store
            .claim_throttle_slot(&order.id, received_at, self.config.cooldown)
            .await?
        {
            debug!(order_id = %order.id, "throttled");
            return Ok(Decision::Throttled);
        }

        // 5. Ask the provider. The slot is already spent by design: a failing
        // provider waits out a full cooldown before the next attempt.
        let route = match self
            .provider
            .live_eta(position, order.shop_location.coords)
            .await
        {
            Ok(route) => route,
            Err(e) => {
                warn!(
                    order_id = %order.id,
                    provider = self.provider.id(),
                    error = %e,
                    "provider lookup failed, cycle abandoned"
                );
                return Ok(Decision::ProviderUnavailable);
            }
        };

        // 6. Slack = time available minus time required.
        let eta_minutes = route.eta_minutes();
        let slack_minutes = eta_minutes - i64::from(order.prep_time_minutes);

        if slack_minutes <= self.config.slack_buffer_minutes {
            // 7a. Fire the one-shot trigger. Only the winning caller
            // publishes, so listeners see exactly one prep_started.
            if self.store.trigger_preparing(&order.id).await? {
                info!(
                    order_id = %order.id,
                    eta_minutes,
                    slack_minutes,
                    source = %route.source,
                    "prep triggered"
                );
                self.publish(&OrderNotification::PrepStarted {
                    order_id: order.id.clone(),
                    message: format!(
                        "Start cooking now. Traffic-adjusted arrival in {eta_minutes} min."
                    ),
                })
                .await;
                Ok(Decision::PrepStarted {
                    eta_minutes,
                    slack_minutes,
                })
            } else {
                debug!(order_id = %order.id, "trigger race lost, order already preparing");
                Ok(Decision::AlreadyTriggered)
            }
        } else {
            // 7b. Still slack left: refresh the dashboard. The claim in step
            // 4 already persisted last_provider_check, before this publish.
            debug!(order_id = %order.id, eta_minutes, slack_minutes, "eta refresh");
            self.publish(&OrderNotification::EtaUpdate {
                order_id: order.id.clone(),
                eta: eta_minutes,
                slack: slack_minutes,
            })
            .await;
            Ok(Decision::EtaPublished {
                eta_minutes,
                slack_minutes,
            })
        }
    }

    /// Publish with the state already durable; a lost notification is
    /// recoverable by re-reading the order, so channel failures are absorbed.
    async fn publish(&self, note: &OrderNotification) {
        if let Err(e) = self.channel.publish(note).await {
            tracing::error!(order_id = %note.order_id(), error = %e, "notification publish failed");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use jit_kitchen_channel::RecordingChannel;
    use jit_kitchen_provider::MockEtaProvider;
    use jit_kitchen_store::InMemoryStore;
    use jit_kitchen_types::{Order, ShopLocation};

    struct Harness {
        store: Arc<InMemoryStore>,
        provider: Arc<MockEtaProvider>,
        channel: Arc<RecordingChannel>,
        engine: TrackingEngine,
    }

    fn harness(config: EngineConfig) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(MockEtaProvider::new("mock"));
        let channel = Arc::new(RecordingChannel::new());
        let engine = TrackingEngine::new(
            store.clone(),
            provider.clone(),
            channel.clone(),
            config,
        );
        Harness {
            store,
            provider,
            channel,
            engine,
        }
    }

    async fn seed_order(store: &InMemoryStore, prep_time_minutes: u32) -> Order {
        let order = Order::new(
            "Ada",
            ShopLocation::new(40.7128, -74.006, None).unwrap(),
            prep_time_minutes,
        )
        .unwrap();
        store.create(&order).await.unwrap();
        order
    }

    fn sample(order_id: &str) -> LocationUpdate {
        LocationUpdate::new(order_id, 40.75, -73.99)
    }

    #[tokio::test]
    async fn test_trigger_on_negative_slack() {
        // prep 10, provider 540s (9 min) => slack -1 <= 1 => trigger
        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(540).await;

        let decision = h.engine.process_update(&sample(&order.id)).await.unwrap();
        assert_eq!(
            decision,
            Decision::PrepStarted {
                eta_minutes: 9,
                slack_minutes: -1
            }
        );

        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
        assert_eq!(h.channel.prep_started_count().await, 1);
    }

    #[tokio::test]
    async fn test_trigger_on_exact_buffer_equality() {
        // prep 9, provider 600s (10 min) => slack 1 <= 1 => trigger
        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 9).await;
        h.provider.set_duration(600).await;

        let decision = h.engine.process_update(&sample(&order.id)).await.unwrap();
        assert_eq!(
            decision,
            Decision::PrepStarted {
                eta_minutes: 10,
                slack_minutes: 1
            }
        );
    }

    #[tokio::test]
    async fn test_non_trigger_publishes_eta_update() {
        // prep 10, provider 1200s (20 min) => slack 10 => eta_update
        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(1200).await;

        let decision = h.engine.process_update(&sample(&order.id)).await.unwrap();
        assert_eq!(
            decision,
            Decision::EtaPublished {
                eta_minutes: 20,
                slack_minutes: 10
            }
        );

        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Tracking);
        assert!(stored.last_provider_check.is_some());

        let published = h.channel.published().await;
        assert_eq!(
            published,
            vec![OrderNotification::EtaUpdate {
                order_id: order.id.clone(),
                eta: 20,
                slack: 10
            }]
        );
    }

    #[tokio::test]
    async fn test_throttle_second_sample_within_cooldown() {
        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(1200).await;

        let t0 = Utc::now();
        let first = h
            .engine
            .process_update_at(&sample(&order.id), t0)
            .await
            .unwrap();
        assert!(matches!(first, Decision::EtaPublished { .. }));

        // 5 seconds later: no provider call, no notification
        let second = h
            .engine
            .process_update_at(&sample(&order.id), t0 + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(second, Decision::Throttled);

        assert_eq!(h.provider.calls(), 1);
        assert_eq!(h.channel.published().await.len(), 1);

        // a full cooldown later the window reopens
        let third = h
            .engine
            .process_update_at(&sample(&order.id), t0 + Duration::seconds(60))
            .await
            .unwrap();
        assert!(matches!(third, Decision::EtaPublished { .. }));
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_dead_order_guard() {
        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(540).await;
        h.store.trigger_preparing(&order.id).await.unwrap();

        let decision = h.engine.process_update(&sample(&order.id)).await.unwrap();
        assert_eq!(decision, Decision::Ignored(IgnoreReason::NotTracking));

        // no provider call, no notification, no mutation
        assert_eq!(h.provider.calls(), 0);
        assert!(h.channel.published().await.is_empty());
        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
        assert!(stored.last_provider_check.is_none());
    }

    #[tokio::test]
    async fn test_unknown_order_ignored() {
        let h = harness(EngineConfig::default());
        let decision = h.engine.process_update(&sample("no-such-order")).await.unwrap();
        assert_eq!(decision, Decision::Ignored(IgnoreReason::OrderNotFound));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_position_rejected_before_any_state() {
        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(540).await;

        let bad = LocationUpdate::new(order.id.clone(), 123.0, -74.0);
        let decision = h.engine.process_update(&bad).await.unwrap();
        assert!(matches!(decision, Decision::Rejected { .. }));

        // nothing persisted, nothing called
        assert_eq!(h.provider.calls(), 0);
        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert!(stored.last_provider_check.is_none());
        assert_eq!(stored.status, OrderStatus::Tracking);
    }

    #[tokio::test]
    async fn test_provider_failure_is_absorbed_and_slot_stays_spent() {
        use jit_kitchen_provider::EtaError;

        let h = harness(EngineConfig::default());
        let order = seed_order(&h.store, 10).await;
        h.provider.set_failure(EtaError::Timeout).await;

        let t0 = Utc::now();
        let decision = h
            .engine
            .process_update_at(&sample(&order.id), t0)
            .await
            .unwrap();
        assert_eq!(decision, Decision::ProviderUnavailable);

        // status untouched, nothing published
        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Tracking);
        assert!(h.channel.published().await.is_empty());

        // the failed call consumed the slot: an immediate retry is throttled
        let retry = h
            .engine
            .process_update_at(&sample(&order.id), t0 + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(retry, Decision::Throttled);
        assert_eq!(h.provider.calls(), 1);

        // after the cooldown the next sample retries normally
        h.provider.set_duration(540).await;
        let recovered = h
            .engine
            .process_update_at(&sample(&order.id), t0 + Duration::seconds(60))
            .await
            .unwrap();
        assert!(matches!(recovered, Decision::PrepStarted { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_updates_trigger_exactly_once() {
        // zero cooldown so every sample reaches the trigger race
        let h = harness(EngineConfig::default().with_cooldown(Duration::zero()));
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(300).await; // slack -5

        let engine = Arc::new(h.engine);
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let engine = engine.clone();
                let update = sample(&order.id);
                tokio::spawn(async move { engine.process_update(&update).await.unwrap() })
            })
            .collect();

        let decisions = futures::future::join_all(tasks).await;
        let mut started = 0;
        for decision in decisions {
            match decision.unwrap() {
                Decision::PrepStarted { .. } => started += 1,
                // losers see the already-flipped status at one of three
                // points: the load, the claim, or the trigger itself
                Decision::AlreadyTriggered
                | Decision::Throttled
                | Decision::Ignored(IgnoreReason::NotTracking) => {}
                other => panic!("unexpected decision {other:?}"),
            }
        }

        assert_eq!(started, 1);
        assert_eq!(h.channel.prep_started_count().await, 1);
        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_prefilter_skips_far_samples_without_spending_slot() {
        let h = harness(
            EngineConfig::default().with_prefilter_radius_meters(Some(10_000.0)),
        );
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(1200).await;

        // ~50 km away from the shop
        let far = LocationUpdate::new(order.id.clone(), 41.15, -74.2);
        let decision = h.engine.process_update(&far).await.unwrap();
        assert!(matches!(decision, Decision::Prefiltered { .. }));
        assert_eq!(h.provider.calls(), 0);

        let stored = h.store.get(&order.id).await.unwrap().unwrap();
        assert!(stored.last_provider_check.is_none());

        // a nearby sample right after still gets a fresh slot
        let near = h.engine.process_update(&sample(&order.id)).await.unwrap();
        assert!(matches!(near, Decision::EtaPublished { .. }));
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_slack_buffer() {
        // buffer 5: prep 10 + eta 14 => slack 4 <= 5 => trigger
        let h = harness(EngineConfig::default().with_slack_buffer_minutes(5));
        let order = seed_order(&h.store, 10).await;
        h.provider.set_duration(840).await;

        let decision = h.engine.process_update(&sample(&order.id)).await.unwrap();
        assert_eq!(
            decision,
            Decision::PrepStarted {
                eta_minutes: 14,
                slack_minutes: 4
            }
        );
    }

    #[test]
    fn test_default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.cooldown, Duration::seconds(60));
        assert_eq!(config.slack_buffer_minutes, 1);
        assert!(config.prefilter_radius_meters.is_none());
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(
            Decision::PrepStarted {
                eta_minutes: 9,
                slack_minutes: -1
            }
            .label(),
            "prep_started"
        );
        assert_eq!(Decision::Throttled.label(), "throttled");
        assert_eq!(
            Decision::Ignored(IgnoreReason::OrderNotFound).label(),
            "ignored"
        );
    }
}
