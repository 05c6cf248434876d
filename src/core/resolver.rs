use crate::core::error::EngineError;
use crate::core::search::{Cancellation, SearchEngine};
use crate::models::{MidpointResult, ParticipantLocation, ResolveRequest, ResolveResponse, VenueCandidate};
use crate::services::provider::{PlacesProvider, RoutingProvider};
use crate::services::venues::VenueFinder;
use std::time::Duration;
use validator::Validate;

/// Defaults applied when a venue request omits radius or limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueDefaults {
    pub radius_meters: u32,
    pub limit: usize,
}

impl Default for VenueDefaults {
    fn default() -> Self {
        Self {
            radius_meters: 1500,
            limit: 10,
        }
    }
}

/// Per-call overrides of the configured search limits
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub max_iterations: Option<u32>,
    pub time_budget: Option<Duration>,
    pub cancel: Option<Cancellation>,
}

/// Entry point of the engine
///
/// Composes the search (centroid, then iterative refinement through the
/// travel-time oracle) with an optional venue lookup around the result.
pub struct MidpointResolver<R: RoutingProvider, P: PlacesProvider> {
    search: SearchEngine<R>,
    venues: VenueFinder<P>,
    venue_defaults: VenueDefaults,
}

impl<R: RoutingProvider, P: PlacesProvider> MidpointResolver<R, P> {
    pub fn new(search: SearchEngine<R>, venues: VenueFinder<P>, venue_defaults: VenueDefaults) -> Self {
        Self {
            search,
            venues,
            venue_defaults,
        }
    }

    /// Resolve a fair meeting point with the configured limits
    pub async fn resolve(&self, participants: &[ParticipantLocation]) -> Result<MidpointResult, EngineError> {
        self.resolve_with(participants, ResolveOptions::default()).await
    }

    /// Resolve with per-call limits and an optional cancellation signal
    pub async fn resolve_with(
        &self,
        participants: &[ParticipantLocation],
        options: ResolveOptions,
    ) -> Result<MidpointResult, EngineError> {
        let config = self.search.config();
        self.search
            .find_optimal_point(
                participants,
                options.max_iterations.unwrap_or(config.max_iterations),
                options.time_budget.unwrap_or(config.time_budget),
                options.cancel.as_ref(),
            )
            .await
    }

    /// Resolve, then look up venues around the resolved point
    pub async fn resolve_and_suggest_venues(
        &self,
        participants: &[ParticipantLocation],
        category: &str,
    ) -> Result<(MidpointResult, Vec<VenueCandidate>), EngineError> {
        let result = self.resolve(participants).await?;
        let venues = self
            .venues
            .get_activity_list(
                result.resolved_point,
                category,
                self.venue_defaults.radius_meters,
                self.venue_defaults.limit,
            )
            .await;
        Ok((result, venues))
    }

    /// Serve one inbound request from the surrounding group service
    pub async fn handle(&self, request: ResolveRequest) -> Result<ResolveResponse, EngineError> {
        request.validate()?;

        let options = ResolveOptions {
            time_budget: request.time_budget_ms.map(Duration::from_millis),
            ..ResolveOptions::default()
        };
        let result = self.resolve_with(&request.participants, options).await?;

        let venues = match request.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => Some(
                self.venues
                    .get_activity_list(
                        result.resolved_point,
                        category,
                        request.radius_meters.unwrap_or(self.venue_defaults.radius_meters),
                        request.limit.unwrap_or(self.venue_defaults.limit),
                    )
                    .await,
            ),
            _ => None,
        };

        Ok(ResolveResponse::new(result, venues))
    }
}
