use crate::models::{GeoPoint, TransitMode, VenueCandidate};
use std::future::Future;
use thiserror::Error;

/// Errors an external provider can report
///
/// These never leave the oracle or the venue finder; they are logged and
/// turned into degraded results there.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No provider credential configured")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: String, message: String },

    #[error("No route found")]
    NoRoute,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Point-to-point travel durations
pub trait RoutingProvider: Send + Sync + 'static {
    /// Travel time in minutes from `origin` to `destination`
    fn travel_time(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TransitMode,
    ) -> impl Future<Output = Result<f64, ProviderError>> + Send;
}

/// Nearby venue lookup
pub trait PlacesProvider: Send + Sync + 'static {
    /// Venues of `category` within `radius_meters` of `point`, unranked
    fn nearby(
        &self,
        point: GeoPoint,
        category: &str,
        radius_meters: u32,
    ) -> impl Future<Output = Result<Vec<VenueCandidate>, ProviderError>> + Send;
}
