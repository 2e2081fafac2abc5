//! Primary loss magnitude.

use rq_common::model::Asset;
use rq_math::{finite_or_zero, mean};

/// Mean CVSS of the asset's vulnerabilities, `0.0` when it has none.
pub fn criticality(asset: &Asset) -> f64 {
    let scores: Vec<f64> = asset.vulnerabilities.iter().map(|v| v.cvss).collect();
    mean(&scores)
}

/// `value × criticality`.
pub fn primary_loss_magnitude(asset: &Asset) -> f64 {
    finite_or_zero(asset.value) * criticality(asset)
}
