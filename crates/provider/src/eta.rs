use async_trait::async_trait;
use jit_kitchen_types::GeoPoint;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// ETA provider error types.
///
/// All of these are transient from the engine's point of view: a failed
/// lookup forfeits one decision cycle and nothing else.
#[derive(Debug, Clone, Error)]
pub enum EtaError {
    #[error("provider request timed out")]
    Timeout,

    #[error("no route between origin and destination")]
    NoRoute,

    #[error("malformed provider response: {0}")]
    BadResponse(String),

    #[error("network error: {0}")]
    Network(String),
}

/// A travel-duration estimate between two points
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEta {
    /// Travel duration in seconds
    pub duration_secs: u64,

    /// True when the duration reflects live traffic conditions rather than
    /// free-flow or geometric estimates
    pub traffic_aware: bool,

    /// Which provider produced this estimate (e.g. "distance-matrix",
    /// "great-circle")
    pub source: String,
}

impl RouteEta {
    pub fn new(duration_secs: u64, traffic_aware: bool, source: impl Into<String>) -> Self {
        Self {
            duration_secs,
            traffic_aware,
            source: source.into(),
        }
    }

    /// Duration in whole minutes, rounded half up
    pub fn eta_minutes(&self) -> i64 {
        ((self.duration_secs + 30) / 60) as i64
    }
}

/// Travel-time provider trait
#[async_trait]
pub trait EtaProvider: Send + Sync {
    /// Current travel duration from `origin` to `destination`, using live
    /// conditions where the backend supports them
    async fn live_eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEta, EtaError>;

    /// Provider identifier
    fn id(&self) -> &str;

    /// Health check
    async fn health_check(&self) -> bool {
        true
    }
}

/// Mock provider for testing
pub struct MockEtaProvider {
    id: String,
    response: Arc<RwLock<Result<RouteEta, EtaError>>>,
    calls: AtomicU64,
}

impl MockEtaProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            response: Arc::new(RwLock::new(Err(EtaError::NoRoute))),
            calls: AtomicU64::new(0),
        }
    }

    /// Make every lookup return the given duration
    pub async fn set_duration(&self, duration_secs: u64) {
        *self.response.write().await =
            Ok(RouteEta::new(duration_secs, true, self.id.clone()));
    }

    /// Make every lookup fail with the given error
    pub async fn set_failure(&self, error: EtaError) {
        *self.response.write().await = Err(error);
    }

    /// How many lookups have been made against this mock
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EtaProvider for MockEtaProvider {
    async fn live_eta(
        &self,
        _origin: GeoPoint,
        _destination: GeoPoint,
    ) -> Result<RouteEta, EtaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.read().await.clone()
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn test_eta_minutes_rounds_half_up() {
        assert_eq!(RouteEta::new(540, true, "t").eta_minutes(), 9);
        assert_eq!(RouteEta::new(545, true, "t").eta_minutes(), 9);
        assert_eq!(RouteEta::new(570, true, "t").eta_minutes(), 10);
        assert_eq!(RouteEta::new(600, true, "t").eta_minutes(), 10);
        assert_eq!(RouteEta::new(29, true, "t").eta_minutes(), 0);
        assert_eq!(RouteEta::new(30, true, "t").eta_minutes(), 1);
        assert_eq!(RouteEta::new(0, true, "t").eta_minutes(), 0);
    }

    #[tokio::test]
    async fn test_mock_returns_configured_duration() {
        let mock = MockEtaProvider::new("test");
        mock.set_duration(1200).await;

        let eta = mock
            .live_eta(point(0.0, 0.0), point(1.0, 1.0))
            .await
            .unwrap();
        assert_eq!(eta.duration_secs, 1200);
        assert!(eta.traffic_aware);
        assert_eq!(eta.source, "test");
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let mock = MockEtaProvider::new("test");
        mock.set_failure(EtaError::Timeout).await;

        let result = mock.live_eta(point(0.0, 0.0), point(1.0, 1.0)).await;
        assert!(matches!(result, Err(EtaError::Timeout)));
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockEtaProvider::new("test");
        mock.set_duration(60).await;

        assert_eq!(mock.calls(), 0);
        for _ in 0..3 {
            let _ = mock.live_eta(point(0.0, 0.0), point(1.0, 1.0)).await;
        }
        assert_eq!(mock.calls(), 3);
    }
}
