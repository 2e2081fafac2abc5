//! Weighted relevance aggregation over motivations and goals.

use rq_common::levels::score_or_zero;
use rq_common::model::{FactorOverride, WeightedFactor};
use rq_common::RelevanceLevel;

use crate::preference::canonical_factors;

/// Numeric relevance of an optional level; absent levels score 0.
pub fn relevance_value(level: Option<RelevanceLevel>) -> f64 {
    score_or_zero(level)
}

/// Σ(weight × relevance) over factors. Empty input yields `0.0`.
pub fn aggregate(factors: &[WeightedFactor]) -> f64 {
    rq_math::weighted_sum(
        factors
            .iter()
            .map(|f| (f.weight, relevance_value(f.relevance_level))),
    )
}

/// Aggregate after applying user overrides to the stored factors.
pub fn aggregate_with_overrides(stored: &[WeightedFactor], overrides: &[FactorOverride]) -> f64 {
    aggregate(&canonical_factors(stored, overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_common::FactorId;

    fn factor(id: &str, level: Option<RelevanceLevel>, weight: f64) -> WeightedFactor {
        WeightedFactor::new(id, id.to_uppercase(), level, weight)
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(aggregate(&[]), 0.0);
    }

    #[test]
    fn sums_weight_times_relevance() {
        let factors = vec![
            factor("a", Some(RelevanceLevel::High), 0.5),
            factor("b", Some(RelevanceLevel::Low), 0.5),
        ];
        assert!((aggregate(&factors) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_level_contributes_nothing() {
        let factors = vec![
            factor("a", None, 0.7),
            factor("b", Some(RelevanceLevel::VeryHigh), 0.3),
        ];
        assert!((aggregate(&factors) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn no_normalization_is_applied() {
        let factors = vec![
            factor("a", Some(RelevanceLevel::VeryHigh), 1.0),
            factor("b", Some(RelevanceLevel::VeryHigh), 1.0),
        ];
        assert!((aggregate(&factors) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn override_wins_over_stored() {
        let stored = vec![
            factor("a", Some(RelevanceLevel::Low), 0.5),
            factor("b", Some(RelevanceLevel::Low), 0.5),
        ];
        let overrides = vec![FactorOverride::new(
            FactorId::from("a"),
            Some(RelevanceLevel::VeryHigh),
            Some(0.8),
        )];
        // a: 0.8 × 1.0, b keeps its stored 0.5 × 0.2
        let score = aggregate_with_overrides(&stored, &overrides);
        assert!((score - 0.9).abs() < 1e-12);
    }
}
