use crate::models::GeoPoint;
use geo::{HaversineBearing, HaversineDestination, HaversineDistance};

/// Great-circle distance between two points in meters
#[inline]
pub fn haversine_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    from.to_geo().haversine_distance(&to.to_geo())
}

/// Great-circle distance between two points in kilometers
#[inline]
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    haversine_meters(from, to) / 1000.0
}

/// Move `distance_km` from `origin` along `bearing_deg` (0 = north, 90 = east)
///
/// The result is clamped to valid latitude and wrapped into [-180, 180]
/// longitude so every produced coordinate stays a valid pair.
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_km: f64) -> GeoPoint {
    let moved = origin
        .to_geo()
        .haversine_destination(bearing_deg, distance_km * 1000.0);
    normalize(GeoPoint::from_geo(moved))
}

/// Step from `origin` toward `target` by at most `distance_km`
///
/// Never overshoots: if the target is closer than the step, the target
/// itself is returned.
pub fn step_toward(origin: GeoPoint, target: GeoPoint, distance_km: f64) -> GeoPoint {
    let gap_km = haversine_km(origin, target);
    if gap_km <= distance_km || gap_km == 0.0 {
        return target;
    }
    let bearing = origin.to_geo().haversine_bearing(target.to_geo());
    destination(origin, bearing, distance_km)
}

/// Clamp latitude and wrap longitude into the valid ranges
pub fn normalize(point: GeoPoint) -> GeoPoint {
    let lat = point.lat.clamp(-90.0, 90.0);
    let mut lng = point.lng;
    if !(-180.0..=180.0).contains(&lng) {
        lng = (lng + 180.0).rem_euclid(360.0) - 180.0;
    }
    GeoPoint::new(lat, lng)
}
