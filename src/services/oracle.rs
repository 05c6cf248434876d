use crate::models::{GeoPoint, ParticipantLocation, TransitMode, TravelTime, TravelTimes};
use crate::services::cache::{CacheKey, CacheStats, TravelTimeCache};
use crate::services::provider::{ProviderError, RoutingProvider};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Oracle tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleConfig {
    /// Maximum provider requests in flight at once
    pub max_concurrency: usize,
    /// Decimal places kept in cache keys
    pub cache_precision: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            cache_precision: 4,
        }
    }
}

/// Travel times for a list of candidates, in the same order
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub samples: Vec<TravelTimes>,
    /// False when the deadline cut the batch short; missing lookups are
    /// reported as `Unreachable`
    pub complete: bool,
}

/// Fail-open wrapper around a routing provider
///
/// One oracle serves exactly one optimization run: its memoization cache
/// and worker permits are dropped with it. Every provider failure becomes
/// `TravelTime::Unreachable`; nothing here returns an error.
pub struct TravelTimeOracle<R: RoutingProvider> {
    provider: Arc<R>,
    permits: Arc<Semaphore>,
    precision: u32,
    cache: TravelTimeCache,
}

impl<R: RoutingProvider> TravelTimeOracle<R> {
    pub fn new(provider: Arc<R>, config: OracleConfig) -> Self {
        Self {
            provider,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            precision: config.cache_precision,
            cache: TravelTimeCache::new(),
        }
    }

    /// A single lookup; served from the run cache when possible
    pub async fn get_travel_time(
        &mut self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TransitMode,
    ) -> TravelTime {
        let key = CacheKey::new(origin, destination, mode, self.precision);
        if let Some(sample) = self.cache.get(&key) {
            return sample;
        }

        let sample = {
            let _permit = self.permits.acquire().await.ok();
            lookup(self.provider.as_ref(), origin, destination, mode).await
        };
        self.cache.insert(key, sample);
        sample
    }

    /// Travel time from every participant to `candidate`
    pub async fn get_batch_travel_times(
        &mut self,
        candidate: GeoPoint,
        participants: &[ParticipantLocation],
    ) -> TravelTimes {
        self.evaluate_candidates(&[candidate], participants, None)
            .await
            .samples
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Travel times from every participant to each candidate
    ///
    /// All uncached lookups across all candidates are deduplicated and
    /// issued together, at most `max_concurrency` at a time. The call
    /// returns once every lookup has finished or `deadline` passes,
    /// whichever comes first; on expiry outstanding requests are aborted.
    pub async fn evaluate_candidates(
        &mut self,
        candidates: &[GeoPoint],
        participants: &[ParticipantLocation],
        deadline: Option<Instant>,
    ) -> BatchOutcome {
        let keys: Vec<Vec<CacheKey>> = candidates
            .iter()
            .map(|candidate| {
                participants
                    .iter()
                    .map(|p| CacheKey::new(p.coordinate, *candidate, p.transit_mode, self.precision))
                    .collect()
            })
            .collect();

        let mut misses: BTreeMap<CacheKey, (GeoPoint, GeoPoint, TransitMode)> = BTreeMap::new();
        for (candidate, row) in candidates.iter().zip(&keys) {
            for (participant, key) in participants.iter().zip(row) {
                if misses.contains_key(key) {
                    continue;
                }
                if self.cache.get(key).is_none() {
                    misses.insert(*key, (participant.coordinate, *candidate, participant.transit_mode));
                }
            }
        }

        let complete = if misses.is_empty() {
            true
        } else {
            self.fetch(misses, deadline).await
        };

        let samples = keys
            .iter()
            .map(|row| {
                participants
                    .iter()
                    .zip(row)
                    .map(|(p, key)| {
                        let sample = self.cache.peek(key).unwrap_or(TravelTime::Unreachable);
                        (p.participant_id.clone(), sample)
                    })
                    .collect()
            })
            .collect();

        BatchOutcome { samples, complete }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn fetch(
        &mut self,
        misses: BTreeMap<CacheKey, (GeoPoint, GeoPoint, TransitMode)>,
        deadline: Option<Instant>,
    ) -> bool {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::debug!("Deadline already passed, skipping {} lookups", misses.len());
            return false;
        }

        tracing::debug!("Dispatching {} travel-time lookups", misses.len());

        let mut pending = JoinSet::new();
        for (key, (origin, destination, mode)) in misses {
            let provider = Arc::clone(&self.provider);
            let permits = Arc::clone(&self.permits);
            pending.spawn(async move {
                let sample = match permits.acquire_owned().await {
                    Ok(_permit) => lookup(provider.as_ref(), origin, destination, mode).await,
                    Err(_) => TravelTime::Unreachable,
                };
                (key, sample)
            });
        }

        let cache = &mut self.cache;
        let gather = async {
            while let Some(joined) = pending.join_next().await {
                match joined {
                    Ok((key, sample)) => cache.insert(key, sample),
                    Err(e) => tracing::warn!("Travel-time lookup task failed: {}", e),
                }
            }
        };

        let complete = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, gather).await.is_ok(),
            None => {
                gather.await;
                true
            }
        };

        if !complete {
            tracing::warn!("Deadline reached with {} lookups in flight, abandoning them", pending.len());
            pending.abort_all();
        }

        complete
    }
}

/// One provider call with every failure folded into `Unreachable`
async fn lookup<R: RoutingProvider>(
    provider: &R,
    origin: GeoPoint,
    destination: GeoPoint,
    mode: TransitMode,
) -> TravelTime {
    match provider.travel_time(origin, destination, mode).await {
        Ok(minutes) if minutes.is_finite() && minutes >= 0.0 => TravelTime::Minutes(minutes),
        Ok(minutes) => {
            tracing::warn!("Provider returned unusable duration {} for {} -> {}", minutes, origin, destination);
            TravelTime::Unreachable
        }
        Err(ProviderError::MissingCredential) => {
            tracing::debug!("No routing credential, treating {} -> {} as unreachable", origin, destination);
            TravelTime::Unreachable
        }
        Err(e) => {
            tracing::warn!("Travel-time lookup {} -> {} ({}) failed: {}", origin, destination, mode, e);
            TravelTime::Unreachable
        }
    }
}
