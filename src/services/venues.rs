use crate::core::distance::haversine_meters;
use crate::models::{GeoPoint, RankingWeights, VenueCandidate};
use crate::services::provider::{PlacesProvider, ProviderError};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Looks up and ranks venues around a resolved point
///
/// Soft-fails: any provider error (including a missing credential) yields
/// an empty list.
pub struct VenueFinder<P: PlacesProvider> {
    provider: Arc<P>,
    weights: RankingWeights,
}

impl<P: PlacesProvider> Clone for VenueFinder<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            weights: self.weights,
        }
    }
}

impl<P: PlacesProvider> VenueFinder<P> {
    pub fn new(provider: Arc<P>, weights: RankingWeights) -> Self {
        Self { provider, weights }
    }

    /// Ranked venues of `category` within `radius_meters` of `point`
    pub async fn get_activity_list(
        &self,
        point: GeoPoint,
        category: &str,
        radius_meters: u32,
        limit: usize,
    ) -> Vec<VenueCandidate> {
        if limit == 0 {
            return Vec::new();
        }

        let venues = match self.provider.nearby(point, category, radius_meters).await {
            Ok(venues) => venues,
            Err(ProviderError::MissingCredential) => {
                tracing::debug!("No places credential, skipping venue lookup");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Venue lookup for '{}' around {} failed: {}", category, point, e);
                return Vec::new();
            }
        };

        let ranked = rank_venues(point, venues, radius_meters, limit, &self.weights);

        tracing::debug!("Ranked {} '{}' venues around {}", ranked.len(), category, point);

        ranked
    }
}

/// Rank raw venues around `point`
///
/// # Pipeline
/// 1. Fill in distance, drop venues outside the radius and duplicate ids
/// 2. Drop closed venues, unless every remaining venue is closed
/// 3. Score, sort (score desc, then distance asc, then id) and truncate
pub fn rank_venues(
    point: GeoPoint,
    venues: Vec<VenueCandidate>,
    radius_meters: u32,
    limit: usize,
    weights: &RankingWeights,
) -> Vec<VenueCandidate> {
    let radius = f64::from(radius_meters.max(1));
    let mut seen = HashSet::new();

    let mut in_range: Vec<VenueCandidate> = venues
        .into_iter()
        .filter(|v| v.coordinate.is_valid())
        .map(|mut v| {
            v.distance_from_point = haversine_meters(point, v.coordinate);
            v
        })
        .filter(|v| v.distance_from_point <= radius)
        .filter(|v| seen.insert(v.external_id.clone()))
        .collect();

    if in_range.iter().any(VenueCandidate::is_open) {
        in_range.retain(VenueCandidate::is_open);
    }

    let max_count = in_range.iter().map(|v| v.rating_count).max().unwrap_or(0);

    let mut scored: Vec<(f64, VenueCandidate)> = in_range
        .into_iter()
        .map(|v| (venue_score(&v, radius, max_count, weights), v))
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.distance_from_point
                    .partial_cmp(&b.distance_from_point)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.external_id.cmp(&b.external_id))
    });

    scored.into_iter().take(limit).map(|(_, v)| v).collect()
}

/// Composite score in [0, 1] (for weights summing to 1)
///
/// rating      -> rating / 5
/// popularity  -> ln(1 + count) / ln(1 + max count in this result set)
/// distance    -> 1 - distance / radius
fn venue_score(venue: &VenueCandidate, radius: f64, max_count: u32, weights: &RankingWeights) -> f64 {
    let rating = venue.rating.unwrap_or(0.0).clamp(0.0, 5.0) / 5.0;

    let popularity = if max_count > 0 {
        (1.0 + f64::from(venue.rating_count)).ln() / (1.0 + f64::from(max_count)).ln()
    } else {
        0.0
    };

    let proximity = (1.0 - venue.distance_from_point / radius).clamp(0.0, 1.0);

    rating * weights.rating + popularity * weights.popularity + proximity * weights.distance
}
