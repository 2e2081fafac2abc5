//! Threat ability: sophistication and resource scores blended by two weights.

use rq_common::levels::score_or_zero;
use rq_common::model::{SophisticationResourceWeights, ThreatActor};
use rq_math::{clamp_unit, finite_or_zero};
use serde::Serialize;

/// `TA = sophistication × w1 + resource × w2`.
///
/// `w1 + w2 = 1` is expected but not enforced; the slider that produces the
/// weights keeps them complementary.
pub fn threat_ability(
    sophistication_score: f64,
    resource_score: f64,
    weights: &SophisticationResourceWeights,
) -> f64 {
    finite_or_zero(sophistication_score) * finite_or_zero(weights.sophistication)
        + finite_or_zero(resource_score) * finite_or_zero(weights.resource)
}

/// Weights with `w2 = 1 - w1`, `w1` clamped into `[0, 1]`.
pub fn complementary_weights(sophistication: f64) -> SophisticationResourceWeights {
    let w1 = clamp_unit(sophistication);
    SophisticationResourceWeights {
        sophistication: w1,
        resource: 1.0 - w1,
    }
}

/// Ability of one actor with its component scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThreatAbility {
    pub sophistication_score: f64,
    pub resource_score: f64,
    pub weights: SophisticationResourceWeights,
    pub ability: f64,
}

impl ThreatAbility {
    pub fn of(actor: &ThreatActor, weights: SophisticationResourceWeights) -> Self {
        let sophistication_score = score_or_zero(actor.sophistication_level);
        let resource_score = score_or_zero(actor.resource_level);
        ThreatAbility {
            sophistication_score,
            resource_score,
            weights,
            ability: threat_ability(sophistication_score, resource_score, &weights),
        }
    }
}
