use async_trait::async_trait;
use jit_kitchen_types::GeoPoint;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::eta::{EtaError, EtaProvider, RouteEta};

/// Default per-request timeout. A slow provider is a failed lookup, never a
/// stalled engine.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Distance-matrix HTTP client.
///
/// Queries a Google-style distance matrix endpoint with `mode=driving` and
/// `departure_time=now`, preferring the traffic-adjusted duration when the
/// backend returns one.
pub struct DistanceMatrixProvider {
    id: String,
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl DistanceMatrixProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: "distance-matrix".to_string(),
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<DurationValue>,
    duration_in_traffic: Option<DurationValue>,
}

#[derive(Debug, Deserialize)]
struct DurationValue {
    value: u64,
}

/// Map a matrix response body to a route estimate
fn parse_matrix(data: MatrixResponse, source: &str) -> Result<RouteEta, EtaError> {
    if data.status != "OK" {
        return Err(EtaError::BadResponse(format!(
            "matrix status {}",
            data.status
        )));
    }

    let element = data
        .rows
        .first()
        .and_then(|r| r.elements.first())
        .ok_or_else(|| EtaError::BadResponse("empty matrix".to_string()))?;

    match element.status.as_str() {
        "OK" => {}
        "NOT_FOUND" | "ZERO_RESULTS" => return Err(EtaError::NoRoute),
        other => {
            return Err(EtaError::BadResponse(format!("element status {other}")));
        }
    }

    // duration_in_traffic is the live-conditions figure; duration alone is
    // the free-flow fallback
    let (duration_secs, traffic_aware) = match (&element.duration_in_traffic, &element.duration) {
        (Some(d), _) => (d.value, true),
        (None, Some(d)) => (d.value, false),
        (None, None) => {
            return Err(EtaError::BadResponse("missing duration".to_string()));
        }
    };

    Ok(RouteEta::new(duration_secs, traffic_aware, source))
}

#[async_trait]
impl EtaProvider for DistanceMatrixProvider {
    async fn live_eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteEta, EtaError> {
        let url = format!("{}/maps/api/distancematrix/json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("origins", origin.to_string()),
                ("destinations", destination.to_string()),
                ("mode", "driving".to_string()),
                ("departure_time", "now".to_string()),
                ("key", self.api_key.clone()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EtaError::Timeout
                } else {
                    EtaError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(EtaError::Network(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        let data: MatrixResponse = response
            .json()
            .await
            .map_err(|e| EtaError::BadResponse(e.to_string()))?;

        let route = parse_matrix(data, &self.id)?;
        tracing::debug!(
            duration_secs = route.duration_secs,
            traffic_aware = route.traffic_aware,
            "distance matrix lookup"
        );
        Ok(route)
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(&self.base_url)
            .timeout(self.timeout)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
