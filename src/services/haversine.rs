//! Haversine travel-time estimator (credential-free routing provider).
//!
//! Uses great-circle distance and a per-mode speed to estimate duration.
//! Less accurate than a real router (ignores roads and schedules) but
//! always available and fully deterministic.

use crate::core::distance::haversine_km;
use crate::models::{GeoPoint, TransitMode};
use crate::services::provider::{ProviderError, RoutingProvider};

/// Ratio of road distance to straight-line distance.
const DEFAULT_DETOUR_FACTOR: f64 = 1.3;

/// Haversine-based routing provider.
#[derive(Debug, Clone)]
pub struct HaversineEstimator {
    pub driving_kmh: f64,
    pub transit_kmh: f64,
    pub walking_kmh: f64,
    pub bicycling_kmh: f64,
    pub detour_factor: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            driving_kmh: 40.0,
            transit_kmh: 25.0,
            walking_kmh: 5.0,
            bicycling_kmh: 15.0,
            detour_factor: DEFAULT_DETOUR_FACTOR,
        }
    }
}

impl HaversineEstimator {
    pub fn speed_kmh(&self, mode: TransitMode) -> f64 {
        match mode {
            TransitMode::Driving => self.driving_kmh,
            TransitMode::Transit => self.transit_kmh,
            TransitMode::Walking => self.walking_kmh,
            TransitMode::Bicycling => self.bicycling_kmh,
        }
    }

    /// Estimated minutes between two points.
    pub fn estimate_minutes(&self, origin: GeoPoint, destination: GeoPoint, mode: TransitMode) -> f64 {
        let km = haversine_km(origin, destination) * self.detour_factor;
        km / self.speed_kmh(mode) * 60.0
    }
}

impl RoutingProvider for HaversineEstimator {
    async fn travel_time(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TransitMode,
    ) -> Result<f64, ProviderError> {
        let speed = self.speed_kmh(mode);
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ProviderError::NoRoute);
        }
        Ok(self.estimate_minutes(origin, destination, mode))
    }
}
