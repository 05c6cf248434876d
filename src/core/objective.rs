use crate::models::{GeoPoint, TravelTime, TravelTimes};

/// Minimax fairness objective over per-participant travel times
///
/// cost = worst + tie_break_weight * total
///
/// The worst travel time dominates; the total only separates candidates
/// whose worst case is (nearly) equal. Unreachable samples count as
/// `unreachable_penalty_minutes`, a large finite value, so a candidate
/// that reaches more participants still scores better than one that
/// reaches fewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairnessObjective {
    pub unreachable_penalty_minutes: f64,
    pub tie_break_weight: f64,
}

impl Default for FairnessObjective {
    fn default() -> Self {
        Self {
            unreachable_penalty_minutes: 720.0,
            tie_break_weight: 0.001,
        }
    }
}

impl FairnessObjective {
    pub fn new(unreachable_penalty_minutes: f64, tie_break_weight: f64) -> Self {
        Self {
            unreachable_penalty_minutes,
            tie_break_weight,
        }
    }

    /// Score a candidate. Lower is better; an empty sample set costs 0.
    pub fn evaluate(&self, _candidate: GeoPoint, samples: &TravelTimes) -> f64 {
        let mut worst: f64 = 0.0;
        let mut total = 0.0;

        for sample in samples.values() {
            let minutes = self.effective_minutes(sample);
            worst = worst.max(minutes);
            total += minutes;
        }

        worst + self.tie_break_weight * total
    }

    /// Minutes a sample contributes to the cost
    #[inline]
    pub fn effective_minutes(&self, sample: &TravelTime) -> f64 {
        match sample {
            TravelTime::Minutes(m) if m.is_finite() => m.max(0.0),
            _ => self.unreachable_penalty_minutes,
        }
    }

    /// The participant whose sample contributes most, first by id on ties
    pub fn worst_off<'a>(&self, samples: &'a TravelTimes) -> Option<&'a str> {
        let mut worst: Option<(&str, f64)> = None;
        for (id, sample) in samples {
            let minutes = self.effective_minutes(sample);
            match worst {
                Some((_, current)) if minutes <= current => {}
                _ => worst = Some((id.as_str(), minutes)),
            }
        }
        worst.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[(&str, TravelTime)]) -> TravelTimes {
        values
            .iter()
            .map(|(id, t)| (id.to_string(), *t))
            .collect()
    }

    const POINT: GeoPoint = GeoPoint::new(0.0, 0.0);

    #[test]
    fn test_worst_case_dominates() {
        let objective = FairnessObjective::default();
        let balanced = samples(&[("a", TravelTime::Minutes(20.0)), ("b", TravelTime::Minutes(20.0))]);
        let lopsided = samples(&[("a", TravelTime::Minutes(5.0)), ("b", TravelTime::Minutes(30.0))]);

        assert!(objective.evaluate(POINT, &balanced) < objective.evaluate(POINT, &lopsided));
    }

    #[test]
    fn test_total_breaks_ties() {
        let objective = FairnessObjective::default();
        let lower_total = samples(&[("a", TravelTime::Minutes(10.0)), ("b", TravelTime::Minutes(30.0))]);
        let higher_total = samples(&[("a", TravelTime::Minutes(25.0)), ("b", TravelTime::Minutes(30.0))]);

        assert!(objective.evaluate(POINT, &lower_total) < objective.evaluate(POINT, &higher_total));
    }

    #[test]
    fn test_unreachable_is_finite_and_costly() {
        let objective = FairnessObjective::default();
        let reachable = samples(&[("a", TravelTime::Minutes(90.0))]);
        let unreachable = samples(&[("a", TravelTime::Unreachable)]);

        let cost = objective.evaluate(POINT, &unreachable);
        assert!(cost.is_finite());
        assert!(cost > objective.evaluate(POINT, &reachable));
    }

    #[test]
    fn test_more_reachable_participants_scores_better() {
        let objective = FairnessObjective::default();
        let one_missing = samples(&[("a", TravelTime::Minutes(10.0)), ("b", TravelTime::Unreachable)]);
        let both_missing = samples(&[("a", TravelTime::Unreachable), ("b", TravelTime::Unreachable)]);

        assert!(objective.evaluate(POINT, &one_missing) < objective.evaluate(POINT, &both_missing));
    }

    #[test]
    fn test_cost_is_monotone_in_every_sample() {
        let objective = FairnessObjective::default();
        let base = [12.0, 27.5, 8.0, 40.0];

        for i in 0..base.len() {
            let before: TravelTimes = base
                .iter()
                .enumerate()
                .map(|(j, m)| (format!("p{}", j), TravelTime::Minutes(*m)))
                .collect();
            for bump in [0.5, 5.0, 100.0] {
                let mut after = before.clone();
                after.insert(format!("p{}", i), TravelTime::Minutes(base[i] + bump));
                assert!(
                    objective.evaluate(POINT, &after) >= objective.evaluate(POINT, &before),
                    "raising p{} by {} lowered the cost",
                    i,
                    bump
                );
            }
            let mut lost = before.clone();
            lost.insert(format!("p{}", i), TravelTime::Unreachable);
            assert!(objective.evaluate(POINT, &lost) >= objective.evaluate(POINT, &before));
        }
    }

    #[test]
    fn test_worst_off_prefers_unreachable_then_first_id() {
        let objective = FairnessObjective::default();
        let mixed = samples(&[
            ("a", TravelTime::Minutes(50.0)),
            ("b", TravelTime::Unreachable),
            ("c", TravelTime::Unreachable),
        ]);
        assert_eq!(objective.worst_off(&mixed), Some("b"));

        let tied = samples(&[("x", TravelTime::Minutes(10.0)), ("y", TravelTime::Minutes(10.0))]);
        assert_eq!(objective.worst_off(&tied), Some("x"));
        assert_eq!(objective.worst_off(&TravelTimes::new()), None);
    }
}
