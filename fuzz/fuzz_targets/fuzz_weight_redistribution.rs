//! Fuzz target for weight edits on motivation/goal sets.
//!
//! Whatever the starting weights and edits, an accepted edit leaves every
//! weight finite and non-negative.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rq_common::model::WeightedFactor;
use rq_core::preference::{FactorKind, FactorSet};

#[derive(Debug, Arbitrary)]
struct Input {
    weights: Vec<f64>,
    edits: Vec<(u8, f64)>,
}

fuzz_target!(|input: Input| {
    if input.weights.is_empty() || input.weights.len() > 32 {
        return;
    }
    let factors = input
        .weights
        .iter()
        .enumerate()
        .map(|(i, w)| WeightedFactor::new(format!("f{i}"), "", None, *w))
        .collect();
    let mut set = FactorSet::new(FactorKind::Motivation, factors);

    for (idx, weight) in input.edits {
        let id = format!("f{}", idx as usize % input.weights.len());
        if set.set_weight(&id.as_str().into(), weight).is_ok() {
            assert!(set
                .factors()
                .iter()
                .all(|f| f.weight.is_finite() && f.weight >= 0.0));
        }
    }
});
