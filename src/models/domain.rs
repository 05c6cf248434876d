use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.validate().is_ok()
    }

    /// Convert to a `geo` point (x = longitude, y = latitude)
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }

    pub fn from_geo(point: geo::Point<f64>) -> Self {
        Self {
            lat: point.y(),
            lng: point.x(),
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// How a participant travels to the meeting point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitMode {
    Driving,
    Transit,
    Walking,
    Bicycling,
}

impl TransitMode {
    /// Mode name as understood by the routing provider
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitMode::Driving => "driving",
            TransitMode::Transit => "transit",
            TransitMode::Walking => "walking",
            TransitMode::Bicycling => "bicycling",
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant's location and travel mode, supplied fresh per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParticipantLocation {
    #[validate(length(min = 1))]
    #[serde(rename = "participantId")]
    pub participant_id: String,
    #[validate(nested)]
    pub coordinate: GeoPoint,
    #[serde(rename = "transitMode")]
    pub transit_mode: TransitMode,
}

impl ParticipantLocation {
    pub fn new(participant_id: impl Into<String>, lat: f64, lng: f64, transit_mode: TransitMode) -> Self {
        Self {
            participant_id: participant_id.into(),
            coordinate: GeoPoint::new(lat, lng),
            transit_mode,
        }
    }
}

/// A point visited by the search, with the iteration that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoint {
    pub coordinate: GeoPoint,
    pub iteration: u32,
    pub cost: f64,
}

/// Outcome of one travel-time lookup
///
/// Provider failures of any kind are folded into `Unreachable`; a lookup
/// never raises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TravelTime {
    Minutes(f64),
    Unreachable,
}

impl TravelTime {
    pub fn minutes(&self) -> Option<f64> {
        match self {
            TravelTime::Minutes(m) => Some(*m),
            TravelTime::Unreachable => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, TravelTime::Minutes(_))
    }
}

/// Per-participant travel times for one candidate, ordered by participant id
pub type TravelTimes = BTreeMap<String, TravelTime>;

/// Result of one optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidpointResult {
    #[serde(rename = "resolvedPoint")]
    pub resolved_point: GeoPoint,
    #[serde(rename = "perParticipantTravelTimes")]
    pub per_participant_travel_times: TravelTimes,
    #[serde(rename = "iterationsUsed")]
    pub iterations_used: u32,
    pub converged: bool,
    /// Objective value at `resolved_point`
    pub cost: f64,
    /// Accepted candidates in order; the first entry is the centroid
    pub trajectory: Vec<CandidatePoint>,
}

/// A venue returned by the places provider, ranked around a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueCandidate {
    #[serde(rename = "externalId")]
    pub external_id: String,
    pub name: String,
    pub coordinate: GeoPoint,
    pub category: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(rename = "ratingCount", default)]
    pub rating_count: u32,
    #[serde(rename = "priceLevel", default)]
    pub price_level: Option<u8>,
    #[serde(rename = "openNow", default)]
    pub open_now: Option<bool>,
    /// Great-circle distance in meters from the search point
    #[serde(rename = "distanceFromPoint", default)]
    pub distance_from_point: f64,
}

impl VenueCandidate {
    /// Unknown opening hours count as open
    pub fn is_open(&self) -> bool {
        self.open_now.unwrap_or(true)
    }
}

/// Venue ranking weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub rating: f64,
    pub popularity: f64,
    pub distance: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            rating: 0.5,
            popularity: 0.2,
            distance: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(49.2827, -123.1207).is_valid());
        assert!(GeoPoint::new(90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.5, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.1).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_travel_time_serializes_unreachable_as_null() {
        let mut times = TravelTimes::new();
        times.insert("a".to_string(), TravelTime::Minutes(12.5));
        times.insert("b".to_string(), TravelTime::Unreachable);

        let json = serde_json::to_string(&times).unwrap();
        assert_eq!(json, r#"{"a":12.5,"b":null}"#);

        let parsed: TravelTimes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, times);
    }

    #[test]
    fn test_transit_mode_wire_names() {
        let mode: TransitMode = serde_json::from_str(r#""bicycling""#).unwrap();
        assert_eq!(mode, TransitMode::Bicycling);
        assert_eq!(TransitMode::Transit.as_str(), "transit");
    }
}
