//! Geodesic distance and geofence checks.
//!
//! Distances are consumed as whole meters (round-half-to-even), matching the
//! wire representation used by the attestation builder and chain gateway.

/// Mean earth radius in meters, per spec.md §4.3.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// The default geofence radius in meters, overridable per session.
pub const DEFAULT_RADIUS_METERS: u32 = 2_000;

/// Computes the haversine distance in meters between two decimal-degree
/// points, then rounds to the nearest integer meter (ties to even).
pub fn geodesic_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> u64 {
    let distance = haversine_meters(lat1, lon1, lat2, lon2);
    distance.round_ties_even() as u64
}

/// Raw (unrounded) haversine distance in meters.
fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// `true` iff `distance_meters <= radius_meters`.
pub fn within_radius(distance_meters: u64, radius_meters: u32) -> bool {
    distance_meters <= radius_meters as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(geodesic_distance_meters(37.7749, -122.4194, 37.7749, -122.4194), 0);
    }

    #[test]
    fn san_francisco_short_hop_is_small() {
        // ~14 meters, matches the "Happy pickup" scenario in spec.md §8.
        let d = geodesic_distance_meters(37.7749, -122.4194, 37.7750, -122.4193);
        assert!(d < 20, "expected a short hop, got {d}m");
    }

    #[test]
    fn equator_one_hundredth_degree_is_about_1113_meters() {
        // Matches the "Drop with bounded reward" scenario in spec.md §8.
        let d = geodesic_distance_meters(0.0, 0.0, 0.0, 0.01);
        assert_eq!(d, 1113);
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        assert!(within_radius(2000, 2000));
        assert!(!within_radius(2001, 2000));
    }
}
