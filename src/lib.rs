//! Midpoint Engine - fair meeting-point optimization for dispersed groups
//!
//! Turns participant locations and travel modes into a resolved meeting
//! point and a ranked list of nearby venues. Travel times and venues come
//! from external providers that may be slow, rate limited, or down; the
//! engine bounds its fan-out, honors a wall-clock budget, and degrades to
//! a best-effort answer instead of failing.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{compute_centroid, Cancellation, EngineError, FairnessObjective, MidpointResolver, SearchEngine};
pub use crate::models::{GeoPoint, MidpointResult, ParticipantLocation, ResolveRequest, ResolveResponse, TransitMode, TravelTime, VenueCandidate};
pub use crate::services::{GoogleMapsClient, HaversineEstimator, PlacesProvider, RoutingProvider, TravelTimeOracle, VenueFinder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let centroid = compute_centroid(&[
            ParticipantLocation::new("a", 10.0, 20.0, TransitMode::Walking),
            ParticipantLocation::new("b", 20.0, 40.0, TransitMode::Walking),
        ])
        .unwrap();
        assert_eq!(centroid, GeoPoint::new(15.0, 30.0));
    }
}
