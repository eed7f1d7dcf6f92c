//! Geofence math for Siteline.
//!
//! A site's geofence is a circle around its registered coordinate,
//! defined by an admission radius in meters. This crate provides the
//! great-circle distance between two points and the point-in-radius
//! admission check the shift ledger runs on every geolocated transition.
//!
//! Pure and deterministic: no I/O, no clock, no configuration.

use siteline_types::GeoPoint;

/// Mean Earth radius in meters, as used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Result of an admission check against a site's geofence.
///
/// The boolean is decided on the unrounded distance so that a point
/// does not flicker across the boundary depending on display rounding;
/// [`RangeCheck::rounded_m`] is what clients show to the user.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RangeCheck {
    /// Whether the query point lies inside the admission radius.
    pub in_radius: bool,
    /// Unrounded great-circle distance from the site center, in meters.
    pub distance_m: f64,
}

impl RangeCheck {
    /// Distance rounded to the nearest meter, for display.
    pub fn rounded_m(&self) -> u32 {
        let rounded = self.distance_m.round();
        if rounded >= u32::MAX as f64 {
            u32::MAX
        } else {
            rounded as u32
        }
    }
}

/// Great-circle (Haversine) distance between two points, in meters.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Admission check: is `point` within `radius_m` meters of `center`?
pub fn check_location(center: GeoPoint, radius_m: u32, point: GeoPoint) -> RangeCheck {
    let distance = distance_m(center, point);
    RangeCheck {
        in_radius: distance <= f64::from(radius_m),
        distance_m: distance,
    }
}
