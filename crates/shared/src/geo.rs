//! Great-circle distance on a spherical Earth.

use crate::domain::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between `a` and `b` in kilometers.
///
/// `h` is clamped to `[0, 1]` so that rounding near antipodal points cannot
/// push `asin` out of its domain.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let half_dlat = (b.latitude - a.latitude).to_radians() / 2.0;
    let half_dlon = (b.longitude - a.longitude).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlon.sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Inclusive radius test used when filtering a feed.
pub fn within_radius(center: Coordinate, point: Coordinate, radius_km: f64) -> bool {
    distance_km(center, point) <= radius_km
}

/// Rounds a distance to two decimal places for display.
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "tests/geo_tests.rs"]
mod tests;
