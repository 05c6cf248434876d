use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::ParticipantLocation;

/// Request to resolve a meeting point, optionally with venue suggestions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveRequest {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub participants: Vec<ParticipantLocation>,
    #[serde(default)]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 50000))]
    #[serde(alias = "radius_meters", rename = "radiusMeters", default)]
    pub radius_meters: Option<u32>,
    #[validate(range(min = 1, max = 60))]
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(alias = "time_budget_ms", rename = "timeBudgetMs", default)]
    pub time_budget_ms: Option<u64>,
}
