use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters, used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Coordinate validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} out of range [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    InvalidLongitude(f64),

    #[error("coordinate is not a finite number")]
    NotFinite,
}

/// A validated WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Construct a point, rejecting non-finite or out-of-range coordinates
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeoError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance to another point in meters (haversine)
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// The stationary destination of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopLocation {
    pub coords: GeoPoint,
    pub address: Option<String>,
}

impl ShopLocation {
    pub fn new(lat: f64, lng: f64, address: Option<String>) -> Result<Self, GeoError> {
        Ok(Self {
            coords: GeoPoint::new(lat, lng)?,
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_point() {
        let p = GeoPoint::new(52.52, 13.405).unwrap();
        assert_eq!(p.lat, 52.52);
        assert_eq!(p.lng, 13.405);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            GeoPoint::new(91.0, 0.0),
            Err(GeoError::InvalidLatitude(91.0))
        );
        assert_eq!(
            GeoPoint::new(0.0, -180.5),
            Err(GeoError::InvalidLongitude(-180.5))
        );
        assert_eq!(GeoPoint::new(f64::NAN, 0.0), Err(GeoError::NotFinite));
        assert_eq!(GeoPoint::new(0.0, f64::INFINITY), Err(GeoError::NotFinite));
    }

    #[test]
    fn test_distance_zero() {
        let p = GeoPoint::new(40.0, -73.9).unwrap();
        assert!(p.distance_meters(&p) < f64::EPSILON);
    }

    #[test]
    fn test_distance_one_degree_longitude_at_equator() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();

        // One degree of longitude at the equator is roughly 111.2 km
        let d = a.distance_meters(&b);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn test_distance_symmetric() {
        let a = GeoPoint::new(48.8566, 2.3522).unwrap();
        let b = GeoPoint::new(51.5074, -0.1278).unwrap();
        assert!((a.distance_meters(&b) - b.distance_meters(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_shop_location_validates_coords() {
        assert!(ShopLocation::new(95.0, 0.0, None).is_err());
        let shop = ShopLocation::new(40.7128, -74.006, Some("1 Pizza Way".into())).unwrap();
        assert_eq!(shop.address.as_deref(), Some("1 Pizza Way"));
    }

    #[test]
    fn test_serde_round_trip() {
        let p = GeoPoint::new(12.34, 56.78).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
