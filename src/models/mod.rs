// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidatePoint, GeoPoint, MidpointResult, ParticipantLocation, RankingWeights, TransitMode,
    TravelTime, TravelTimes, VenueCandidate,
};
pub use requests::ResolveRequest;
pub use responses::ResolveResponse;
