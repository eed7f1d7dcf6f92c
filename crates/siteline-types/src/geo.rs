use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A validated WGS84 coordinate pair.
///
/// Construction through [`GeoPoint::new`] guarantees both components are
/// finite and inside the valid latitude/longitude ranges, so downstream
/// distance math never has to re-check.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees, -90.0..=90.0.
    pub lat: f64,
    /// Longitude in decimal degrees, -180.0..=180.0.
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, validating both components.
    pub fn new(lat: f64, lon: f64) -> Result<Self, TypeError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(TypeError::InvalidCoordinate {
                field: "lat",
                value: lat,
            });
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(TypeError::InvalidCoordinate {
                field: "lon",
                value: lon,
            });
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Debug for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeoPoint({:.6}, {:.6})", self.lat, self.lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn new_accepts_valid_ranges() {
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let p = GeoPoint::new(48.8584, 2.2945).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let parsed: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(p, parsed);
    }

    proptest! {
        #[test]
        fn valid_range_always_constructs(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            prop_assert!(GeoPoint::new(lat, lon).is_ok());
        }
    }
}
