use crate::core::centroid::compute_centroid;
use crate::core::distance::{destination, haversine_km, step_toward};
use crate::core::error::EngineError;
use crate::core::objective::FairnessObjective;
use crate::models::{CandidatePoint, GeoPoint, MidpointResult, ParticipantLocation, TravelTime, TravelTimes};
use crate::services::oracle::{OracleConfig, TravelTimeOracle};
use crate::services::provider::RoutingProvider;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use validator::Validate;

/// Fractions of the current step used when moving toward the worst-off participant
const TOWARD_WORST_SCALES: [f64; 3] = [1.0, 0.5, 0.25];
/// Compass bearings probed at half the current step
const COMPASS_BEARINGS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Search limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub max_iterations: u32,
    pub time_budget: Duration,
    /// Minimum cost improvement (minutes) for a neighbor to be accepted
    pub epsilon: f64,
    pub oracle: OracleConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            time_budget: Duration::from_secs(7),
            epsilon: 0.01,
            oracle: OracleConfig::default(),
        }
    }
}

/// Step-size schedule for the proposal phase
pub trait StepPolicy: Send + Sync {
    /// Step for the first round, given the farthest participant's distance from the centroid
    fn initial_step_km(&self, spread_km: f64) -> f64;

    /// Step for the round after one that used `current_km`
    fn next_step_km(&self, current_km: f64) -> f64;

    /// Below this the search is considered converged
    fn min_step_km(&self) -> f64;
}

/// Start at a fraction of the spread and shrink geometrically
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricStep {
    pub initial_fraction: f64,
    pub decay: f64,
    pub min_step_km: f64,
}

impl Default for GeometricStep {
    fn default() -> Self {
        Self {
            initial_fraction: 0.5,
            decay: 0.5,
            min_step_km: 0.05,
        }
    }
}

impl StepPolicy for GeometricStep {
    fn initial_step_km(&self, spread_km: f64) -> f64 {
        (spread_km * self.initial_fraction).max(self.min_step_km)
    }

    fn next_step_km(&self, current_km: f64) -> f64 {
        current_km * self.decay
    }

    fn min_step_km(&self) -> f64 {
        self.min_step_km
    }
}

/// Caller-held cancellation flag, checked between batches
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// States of one optimization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Initialize,
    Propose,
    EvaluateNeighbors,
    Converged,
    Exhausted,
}

/// Reject empty lists, blank or duplicate ids, and invalid coordinates
pub fn validate_participants(participants: &[ParticipantLocation]) -> Result<(), EngineError> {
    if participants.is_empty() {
        return Err(EngineError::InvalidInput("participant list is empty".to_string()));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for participant in participants {
        participant.validate()?;
        if !participant.coordinate.is_valid() {
            return Err(EngineError::InvalidInput(format!(
                "participant {} has invalid coordinate {}",
                participant.participant_id, participant.coordinate
            )));
        }
        if !seen.insert(participant.participant_id.as_str()) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate participant id {}",
                participant.participant_id
            )));
        }
    }

    Ok(())
}

/// Deadline-bounded hill climb over candidate meeting points
///
/// Starting at the centroid, each round steps toward the participant who
/// currently has the longest trip, evaluates the neighbors through the
/// oracle, and keeps the best one if it lowers the cost by more than
/// `epsilon`. Rounds are strictly sequential, so accepted costs never
/// increase.
pub struct SearchEngine<R: RoutingProvider> {
    provider: Arc<R>,
    objective: FairnessObjective,
    step_policy: Arc<dyn StepPolicy>,
    config: SearchConfig,
}

impl<R: RoutingProvider> Clone for SearchEngine<R> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            objective: self.objective,
            step_policy: Arc::clone(&self.step_policy),
            config: self.config,
        }
    }
}

impl<R: RoutingProvider> SearchEngine<R> {
    pub fn new(provider: Arc<R>, objective: FairnessObjective, config: SearchConfig) -> Self {
        Self {
            provider,
            objective,
            step_policy: Arc::new(GeometricStep::default()),
            config,
        }
    }

    pub fn with_step_policy(mut self, policy: impl StepPolicy + 'static) -> Self {
        self.step_policy = Arc::new(policy);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn objective(&self) -> &FairnessObjective {
        &self.objective
    }

    /// Run with the configured iteration limit and time budget
    pub async fn run(
        &self,
        participants: &[ParticipantLocation],
        cancel: Option<&Cancellation>,
    ) -> Result<MidpointResult, EngineError> {
        self.find_optimal_point(participants, self.config.max_iterations, self.config.time_budget, cancel)
            .await
    }

    /// Find the point minimizing the fairness objective
    ///
    /// Only invalid input is an error. Running out of iterations, time, or
    /// being cancelled returns the best point so far with
    /// `converged = false`.
    pub async fn find_optimal_point(
        &self,
        participants: &[ParticipantLocation],
        max_iterations: u32,
        time_budget: Duration,
        cancel: Option<&Cancellation>,
    ) -> Result<MidpointResult, EngineError> {
        validate_participants(participants)?;
        let centroid = compute_centroid(participants)?;
        let run_id = uuid::Uuid::new_v4();

        tracing::info!(
            "Search {} started: {} participants, centroid {}, max {} iterations, budget {:?}",
            run_id,
            participants.len(),
            centroid,
            max_iterations,
            time_budget
        );

        let mut run = SearchRun {
            engine: self,
            oracle: TravelTimeOracle::new(Arc::clone(&self.provider), self.config.oracle),
            participants,
            max_iterations,
            deadline: Instant::now() + time_budget,
            cancel,
            centroid,
            current: centroid,
            current_cost: 0.0,
            current_samples: TravelTimes::new(),
            step_km: 0.0,
            iteration: 0,
            neighbors: Vec::new(),
            trajectory: Vec::new(),
            any_reachable: false,
        };

        let mut phase = SearchPhase::Initialize;
        loop {
            phase = match phase {
                SearchPhase::Initialize => run.initialize().await,
                SearchPhase::Propose => run.propose(),
                SearchPhase::EvaluateNeighbors => run.evaluate_neighbors().await,
                SearchPhase::Converged | SearchPhase::Exhausted => break,
            };
        }

        let stats = run.oracle.cache_stats();
        let result = run.finish(phase);

        tracing::info!(
            "Search {} finished: {} after {} iterations at {} (cost {:.2}, cache {}/{} hits)",
            run_id,
            if result.converged { "converged" } else { "not converged" },
            result.iterations_used,
            result.resolved_point,
            result.cost,
            stats.hit_count,
            stats.hit_count + stats.miss_count
        );

        Ok(result)
    }
}

/// Mutable state of one run; dropped (with its oracle and cache) on return
struct SearchRun<'a, R: RoutingProvider> {
    engine: &'a SearchEngine<R>,
    oracle: TravelTimeOracle<R>,
    participants: &'a [ParticipantLocation],
    max_iterations: u32,
    deadline: Instant,
    cancel: Option<&'a Cancellation>,
    centroid: GeoPoint,
    current: GeoPoint,
    current_cost: f64,
    current_samples: TravelTimes,
    step_km: f64,
    iteration: u32,
    neighbors: Vec<GeoPoint>,
    trajectory: Vec<CandidatePoint>,
    any_reachable: bool,
}

impl<'a, R: RoutingProvider> SearchRun<'a, R> {
    fn stop_reason(&self) -> Option<&'static str> {
        if self.cancel.is_some_and(Cancellation::is_cancelled) {
            Some("cancelled")
        } else if Instant::now() >= self.deadline {
            Some("time budget")
        } else {
            None
        }
    }

    fn all_unreachable(&self) -> TravelTimes {
        self.participants
            .iter()
            .map(|p| (p.participant_id.clone(), TravelTime::Unreachable))
            .collect()
    }

    fn note_reachability(&mut self, samples: &TravelTimes) {
        if samples.values().any(TravelTime::is_reachable) {
            self.any_reachable = true;
        }
    }

    async fn initialize(&mut self) -> SearchPhase {
        let spread_km = self
            .participants
            .iter()
            .map(|p| haversine_km(self.centroid, p.coordinate))
            .fold(0.0, f64::max);
        self.step_km = self.engine.step_policy.initial_step_km(spread_km);

        let stop = self.stop_reason();
        let (samples, complete) = if stop.is_some() {
            (self.all_unreachable(), false)
        } else {
            let outcome = self
                .oracle
                .evaluate_candidates(&[self.centroid], self.participants, Some(self.deadline))
                .await;
            let complete = outcome.complete;
            (outcome.samples.into_iter().next().unwrap_or_default(), complete)
        };

        self.note_reachability(&samples);
        self.current_cost = self.engine.objective.evaluate(self.centroid, &samples);
        self.current_samples = samples;
        self.trajectory.push(CandidatePoint {
            coordinate: self.centroid,
            iteration: 0,
            cost: self.current_cost,
        });

        tracing::debug!(
            "Initial candidate {} cost {:.2}, spread {:.2}km, step {:.3}km",
            self.centroid,
            self.current_cost,
            spread_km,
            self.step_km
        );

        if !complete {
            tracing::warn!("Search stopped during initial evaluation ({})", stop.unwrap_or("time budget"));
            return SearchPhase::Exhausted;
        }
        SearchPhase::Propose
    }

    fn propose(&mut self) -> SearchPhase {
        if let Some(reason) = self.stop_reason() {
            tracing::warn!("Search exhausted after {} iterations ({})", self.iteration, reason);
            return SearchPhase::Exhausted;
        }
        if self.iteration >= self.max_iterations {
            tracing::debug!("Search exhausted its {} iterations", self.max_iterations);
            return SearchPhase::Exhausted;
        }
        if self.step_km < self.engine.step_policy.min_step_km() {
            tracing::debug!("Step {:.4}km below minimum, converged", self.step_km);
            return SearchPhase::Converged;
        }

        let worst = self
            .engine
            .objective
            .worst_off(&self.current_samples)
            .and_then(|id| self.participants.iter().find(|p| p.participant_id == id))
            .map(|p| p.coordinate);

        let mut neighbors = Vec::with_capacity(TOWARD_WORST_SCALES.len() + COMPASS_BEARINGS.len());
        if let Some(target) = worst {
            for scale in TOWARD_WORST_SCALES {
                neighbors.push(step_toward(self.current, target, self.step_km * scale));
            }
        }
        for bearing in COMPASS_BEARINGS {
            neighbors.push(destination(self.current, bearing, self.step_km * 0.5));
        }

        let current = self.current;
        neighbors.retain(|n| *n != current && n.is_valid());
        neighbors.dedup();

        if neighbors.is_empty() {
            return SearchPhase::Converged;
        }

        self.iteration += 1;
        self.neighbors = neighbors;
        SearchPhase::EvaluateNeighbors
    }

    async fn evaluate_neighbors(&mut self) -> SearchPhase {
        if let Some(reason) = self.stop_reason() {
            tracing::warn!("Search exhausted before evaluating iteration {} ({})", self.iteration, reason);
            return SearchPhase::Exhausted;
        }

        let neighbors = std::mem::take(&mut self.neighbors);
        let outcome = self
            .oracle
            .evaluate_candidates(&neighbors, self.participants, Some(self.deadline))
            .await;

        if !outcome.complete {
            tracing::warn!("Time budget ran out during iteration {}", self.iteration);
            return SearchPhase::Exhausted;
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, (point, samples)) in neighbors.iter().zip(&outcome.samples).enumerate() {
            self.note_reachability(samples);
            let cost = self.engine.objective.evaluate(*point, samples);
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((i, cost));
            }
        }

        match best {
            Some((i, cost)) if cost < self.current_cost - self.engine.config.epsilon => {
                tracing::debug!(
                    "Iteration {}: accepted {} cost {:.2} -> {:.2} (step {:.3}km)",
                    self.iteration,
                    neighbors[i],
                    self.current_cost,
                    cost,
                    self.step_km
                );
                self.current = neighbors[i];
                self.current_cost = cost;
                self.current_samples = outcome.samples.into_iter().nth(i).unwrap_or_default();
                self.trajectory.push(CandidatePoint {
                    coordinate: self.current,
                    iteration: self.iteration,
                    cost,
                });
                self.step_km = self.engine.step_policy.next_step_km(self.step_km);
                SearchPhase::Propose
            }
            _ => {
                tracing::debug!("Iteration {}: no neighbor improved cost {:.2}", self.iteration, self.current_cost);
                SearchPhase::Converged
            }
        }
    }

    fn finish(self, phase: SearchPhase) -> MidpointResult {
        if !self.any_reachable {
            tracing::warn!("No participant was reachable at any candidate, returning the centroid");
            let samples = self.all_unreachable();
            let cost = self.engine.objective.evaluate(self.centroid, &samples);
            return MidpointResult {
                resolved_point: self.centroid,
                per_participant_travel_times: samples,
                iterations_used: self.iteration,
                converged: false,
                cost,
                trajectory: vec![CandidatePoint {
                    coordinate: self.centroid,
                    iteration: 0,
                    cost,
                }],
            };
        }

        MidpointResult {
            resolved_point: self.current,
            per_participant_travel_times: self.current_samples,
            iterations_used: self.iteration,
            converged: phase == SearchPhase::Converged,
            cost: self.current_cost,
            trajectory: self.trajectory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransitMode;
    use crate::services::haversine::HaversineEstimator;
    use crate::services::provider::ProviderError;

    struct DownProvider;

    impl RoutingProvider for DownProvider {
        async fn travel_time(&self, _: GeoPoint, _: GeoPoint, _: TransitMode) -> Result<f64, ProviderError> {
            Err(ProviderError::MissingCredential)
        }
    }

    fn engine() -> SearchEngine<HaversineEstimator> {
        SearchEngine::new(
            Arc::new(HaversineEstimator::default()),
            FairnessObjective::default(),
            SearchConfig::default(),
        )
    }

    /// One walker far from two drivers: the fair point is pulled toward the walker
    fn lopsided_group() -> Vec<ParticipantLocation> {
        vec![
            ParticipantLocation::new("driver_a", 49.2827, -123.1207, TransitMode::Driving),
            ParticipantLocation::new("driver_b", 49.2900, -123.1400, TransitMode::Driving),
            ParticipantLocation::new("walker", 49.2200, -123.0500, TransitMode::Walking),
        ]
    }

    #[tokio::test]
    async fn test_never_worse_than_centroid() {
        let participants = lopsided_group();
        let result = engine().run(&participants, None).await.unwrap();

        let initial = result.trajectory[0];
        assert_eq!(initial.coordinate, compute_centroid(&participants).unwrap());
        assert!(result.cost <= initial.cost);
        // The walker dominates the cost, so the search must have moved
        assert!(result.cost < initial.cost);
        assert!(result.iterations_used >= 1);
    }

    #[tokio::test]
    async fn test_accepted_costs_are_non_increasing() {
        let result = engine().run(&lopsided_group(), None).await.unwrap();

        for pair in result.trajectory.windows(2) {
            assert!(pair[1].cost <= pair[0].cost, "cost rose from {} to {}", pair[0].cost, pair[1].cost);
            assert!(pair[1].iteration > pair[0].iteration);
        }
        assert_eq!(result.trajectory.last().map(|c| c.cost), Some(result.cost));
    }

    #[tokio::test]
    async fn test_unreachable_everywhere_returns_centroid() {
        let participants = lopsided_group();
        let engine = SearchEngine::new(Arc::new(DownProvider), FairnessObjective::default(), SearchConfig::default());

        let result = engine.run(&participants, None).await.unwrap();

        assert_eq!(result.resolved_point, compute_centroid(&participants).unwrap());
        assert!(!result.converged);
        assert!(result
            .per_participant_travel_times
            .values()
            .all(|t| *t == TravelTime::Unreachable));
    }

    #[tokio::test]
    async fn test_iteration_limit_exhausts() {
        let result = engine()
            .find_optimal_point(&lopsided_group(), 1, Duration::from_secs(7), None)
            .await
            .unwrap();

        // The first round improves, so the second proposal hits the limit
        assert_eq!(result.iterations_used, 1);
        assert_eq!(result.trajectory.len(), 2);
        assert!(!result.converged);
    }

    #[tokio::test]
    async fn test_cancelled_run_still_returns_a_point() {
        let cancel = Cancellation::new();
        cancel.cancel();

        let participants = lopsided_group();
        let result = engine().run(&participants, Some(&cancel)).await.unwrap();

        assert!(!result.converged);
        assert_eq!(result.iterations_used, 0);
        assert_eq!(result.resolved_point, compute_centroid(&participants).unwrap());
    }

    #[tokio::test]
    async fn test_co_located_group_converges_in_place() {
        let participants = vec![
            ParticipantLocation::new("a", 40.7128, -74.0060, TransitMode::Driving),
            ParticipantLocation::new("b", 40.7128, -74.0060, TransitMode::Transit),
        ];
        let result = engine().run(&participants, None).await.unwrap();

        assert!(result.converged);
        assert_eq!(result.resolved_point, GeoPoint::new(40.7128, -74.0060));
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        assert!(validate_participants(&[]).is_err());

        let duplicate = vec![
            ParticipantLocation::new("a", 1.0, 1.0, TransitMode::Driving),
            ParticipantLocation::new("a", 2.0, 2.0, TransitMode::Driving),
        ];
        assert!(matches!(validate_participants(&duplicate), Err(EngineError::InvalidInput(_))));

        let out_of_range = vec![ParticipantLocation::new("a", 91.0, 0.0, TransitMode::Walking)];
        assert!(validate_participants(&out_of_range).is_err());

        let blank = vec![ParticipantLocation::new("", 1.0, 1.0, TransitMode::Walking)];
        assert!(validate_participants(&blank).is_err());
    }

    #[test]
    fn test_geometric_step_shrinks() {
        let policy = GeometricStep::default();
        let first = policy.initial_step_km(10.0);
        assert!((first - 5.0).abs() < 1e-9);
        assert!(policy.next_step_km(first) < first);
        assert_eq!(policy.initial_step_km(0.0), policy.min_step_km());
    }
}
