// Core algorithm exports
pub mod centroid;
pub mod distance;
pub mod error;
pub mod objective;
pub mod resolver;
pub mod search;

pub use centroid::compute_centroid;
pub use distance::{haversine_km, haversine_meters, step_toward};
pub use error::EngineError;
pub use objective::FairnessObjective;
pub use resolver::{MidpointResolver, ResolveOptions, VenueDefaults};
pub use search::{Cancellation, GeometricStep, SearchConfig, SearchEngine, SearchPhase, StepPolicy};
