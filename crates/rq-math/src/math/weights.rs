//! Weighted aggregation and proportional weight redistribution.
//!
//! Weight sets are ordered `(key, weight)` slices. The order is the display
//! order of the factors and is never changed by these functions.

use std::fmt;
use thiserror::Error;

use super::stable::{clamp_unit, finite_or_zero};

/// Errors raised at the boundary of a weight edit.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeightError {
    #[error("weight key {0} is not part of the weight set")]
    UnknownKey(String),
    #[error("weight must be a finite number, got {0}")]
    NonFinite(f64),
}

/// Σ(weight × value) over `(weight, value)` pairs. Empty input yields `0.0`.
///
/// No normalization is applied; callers decide whether their weights sum to 1.
pub fn weighted_sum<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    pairs
        .into_iter()
        .map(|(weight, value)| finite_or_zero(weight) * finite_or_zero(value))
        .sum()
}

/// Sum of all weights in a set.
pub fn weight_total<K>(weights: &[(K, f64)]) -> f64 {
    weights.iter().map(|(_, w)| finite_or_zero(*w)).sum()
}

/// Divide every weight by the total so the set sums to 1.
///
/// A set whose total is zero (or not positive) becomes an equal split.
pub fn normalize<K>(weights: &mut [(K, f64)]) {
    if weights.is_empty() {
        return;
    }
    let total = weight_total(weights);
    if total > 0.0 {
        for (_, w) in weights.iter_mut() {
            *w = finite_or_zero(*w) / total;
        }
    } else {
        let share = 1.0 / weights.len() as f64;
        for (_, w) in weights.iter_mut() {
            *w = share;
        }
    }
}

/// Equal weights for `n` items. Empty for `n == 0`.
pub fn equal_split(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Set `key` to `new_weight` and move the difference onto the other keys in
/// proportion to their current weights, then renormalize.
///
/// - a single-key set always ends as `{key: 1.0}`
/// - stored weights are read clamped into `[0, 1]`, non-finite ones as 0
/// - other weights are clamped at 0 before renormalization
/// - when every other weight is 0, `1 - new_weight` is split equally
///
/// `new_weight` is clamped into `[0, 1]`. The set is left untouched when an
/// error is returned.
pub fn redistribute<K>(
    weights: &mut [(K, f64)],
    key: &K,
    new_weight: f64,
) -> Result<(), WeightError>
where
    K: PartialEq + fmt::Debug,
{
    if !new_weight.is_finite() {
        return Err(WeightError::NonFinite(new_weight));
    }
    let target = weights
        .iter()
        .position(|(k, _)| k == key)
        .ok_or_else(|| WeightError::UnknownKey(format!("{key:?}")))?;

    if weights.len() == 1 {
        weights[target].1 = 1.0;
        return Ok(());
    }

    for (_, w) in weights.iter_mut() {
        *w = clamp_unit(finite_or_zero(*w));
    }

    let new_weight = clamp_unit(new_weight);
    let delta = new_weight - weights[target].1;
    let total_other: f64 = weights
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(_, (_, w))| *w)
        .sum();

    if total_other > 0.0 {
        for (i, (_, w)) in weights.iter_mut().enumerate() {
            if i == target {
                continue;
            }
            let share = *w / total_other;
            *w = (*w - delta * share).max(0.0);
        }
    } else {
        let share = (1.0 - new_weight) / (weights.len() - 1) as f64;
        for (i, (_, w)) in weights.iter_mut().enumerate() {
            if i != target {
                *w = share;
            }
        }
    }

    weights[target].1 = new_weight;
    normalize(weights);
    Ok(())
}
