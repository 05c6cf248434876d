use serde::{Deserialize, Serialize};
use crate::models::domain::{GeoPoint, MidpointResult, TravelTimes, VenueCandidate};

/// Response returned to the surrounding group service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(rename = "resolvedPoint")]
    pub resolved_point: GeoPoint,
    #[serde(rename = "perParticipantTravelTimes")]
    pub per_participant_travel_times: TravelTimes,
    #[serde(rename = "iterationsUsed")]
    pub iterations_used: u32,
    pub converged: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub venues: Option<Vec<VenueCandidate>>,
}

impl ResolveResponse {
    pub fn new(result: MidpointResult, venues: Option<Vec<VenueCandidate>>) -> Self {
        Self {
            resolved_point: result.resolved_point,
            per_participant_travel_times: result.per_participant_travel_times,
            iterations_used: result.iterations_used,
            converged: result.converged,
            venues,
        }
    }
}
