use crate::core::error::EngineError;
use crate::models::{GeoPoint, ParticipantLocation};

/// Compute the planar centroid of the participants' coordinates
///
/// Arithmetic mean of latitudes and of longitudes. Good enough at city
/// scale; it is not a geodesic midpoint and does not handle sets that
/// straddle the antimeridian.
///
/// The mean is clamped to the bounding box of the inputs so that rounding
/// can never push it outside.
///
/// # Errors
/// `InvalidInput` if `locations` is empty or any coordinate is non-finite
/// or out of range.
pub fn compute_centroid(locations: &[ParticipantLocation]) -> Result<GeoPoint, EngineError> {
    if locations.is_empty() {
        return Err(EngineError::InvalidInput(
            "cannot compute a centroid of zero locations".to_string(),
        ));
    }

    let n = locations.len() as f64;
    let (mut lat_sum, mut lng_sum) = (0.0, 0.0);
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lng, mut max_lng) = (f64::INFINITY, f64::NEG_INFINITY);

    for location in locations {
        if !location.coordinate.is_valid() {
            return Err(EngineError::InvalidInput(format!(
                "participant {} has invalid coordinate {}",
                location.participant_id, location.coordinate
            )));
        }
        let GeoPoint { lat, lng } = location.coordinate;
        lat_sum += lat;
        lng_sum += lng;
        min_lat = min_lat.min(lat);
        max_lat = max_lat.max(lat);
        min_lng = min_lng.min(lng);
        max_lng = max_lng.max(lng);
    }

    Ok(GeoPoint::new(
        (lat_sum / n).clamp(min_lat, max_lat),
        (lng_sum / n).clamp(min_lng, max_lng),
    ))
}
