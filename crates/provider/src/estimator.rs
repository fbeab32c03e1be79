use async_trait::async_trait;
use jit_kitchen_types::GeoPoint;

use crate::eta::{EtaError, EtaProvider, RouteEta};

/// Default assumed travel speed for the geometric estimate, km/h
pub const DEFAULT_SPEED_KMH: f64 = 30.0;

/// Geometric fallback estimator.
///
/// Divides the great-circle distance by an assumed speed. Pure computation,
/// no I/O, no quota. Every estimate it produces is labeled
/// `traffic_aware = false` with source `"great-circle"`; it is meant for
/// pre-filtering far-away samples or as an emergency degraded estimate, and
/// must not stand in for the live provider inside the trigger decision.
pub struct GreatCircleEstimator {
    id: String,
    speed_kmh: f64,
}

impl GreatCircleEstimator {
    pub fn new() -> Self {
        Self {
            id: "great-circle".to_string(),
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }

    pub fn with_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = speed_kmh;
        self
    }
}

impl Default for GreatCircleEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EtaProvider for GreatCircleEstimator {
    async fn live_eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEta, EtaError> {
        if self.speed_kmh <= 0.0 {
            return Err(EtaError::BadResponse(format!(
                "assumed speed must be positive, got {}",
                self.speed_kmh
            )));
        }

        let meters = origin.distance_meters(&destination);
        let speed_mps = self.speed_kmh / 3.6;
        let duration_secs = (meters / speed_mps).round() as u64;

        Ok(RouteEta::new(duration_secs, false, self.id.clone()))
    }

    fn id(&self) -> &str {
        &self.id
    }
}
