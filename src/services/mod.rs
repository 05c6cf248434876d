// Service exports
pub mod cache;
pub mod google_maps;
pub mod haversine;
pub mod oracle;
pub mod provider;
pub mod venues;

pub use cache::{CacheKey, CacheStats, TravelTimeCache};
pub use google_maps::GoogleMapsClient;
pub use haversine::HaversineEstimator;
pub use oracle::{BatchOutcome, OracleConfig, TravelTimeOracle};
pub use provider::{PlacesProvider, ProviderError, RoutingProvider};
pub use venues::{rank_venues, VenueFinder};
