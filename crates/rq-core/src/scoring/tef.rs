//! Threat Event Frequency.
//!
//! TEF is a five-way product. Any zero factor collapses it, in particular a
//! location or sector mismatch means the actor cannot target the organization.

use rq_common::model::{
    Organization, SophisticationResourceWeights, ThreatActor, UserPreference,
};
use rq_common::ThreatActorId;
use serde::Serialize;

use super::ability::ThreatAbility;
use super::aggregate::aggregate;
use crate::preference::{ability_weights, canonical_factors};

/// `1.0` on exact string equality, `0.0` otherwise. No fuzzy matching.
pub fn attribute_match(actor_value: &str, organization_value: &str) -> f64 {
    if actor_value == organization_value {
        1.0
    } else {
        0.0
    }
}

/// The five factors of a TEF.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TefFactors {
    pub threat_ability: f64,
    pub motivation_score: f64,
    pub goal_score: f64,
    pub location_match: f64,
    pub sector_match: f64,
}

impl TefFactors {
    pub fn tef(&self) -> f64 {
        compute_tef(self)
    }
}

/// `TA × motivation × goal × location × sector`.
pub fn compute_tef(f: &TefFactors) -> f64 {
    rq_math::finite_or_zero(
        f.threat_ability * f.motivation_score * f.goal_score * f.location_match * f.sector_match,
    )
}

/// Everything that went into one actor's TEF.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TefBreakdown {
    pub threat_actor_id: ThreatActorId,
    pub threat_actor_name: String,
    pub sophistication_score: f64,
    pub resource_score: f64,
    pub weights: SophisticationResourceWeights,
    #[serde(flatten)]
    pub factors: TefFactors,
    pub tef: f64,
}

/// Score an actor against an organization, applying the user's preference
/// when one exists.
pub fn score_threat_actor(
    actor: &ThreatActor,
    organization: &Organization,
    preference: Option<&UserPreference>,
    default_weights: SophisticationResourceWeights,
) -> TefBreakdown {
    let weights = ability_weights(preference, default_weights);
    let ability = ThreatAbility::of(actor, weights);

    let (motivation_overrides, goal_overrides) = match preference {
        Some(p) => (p.motivation_analysis.as_slice(), p.goals_analysis.as_slice()),
        None => (&[][..], &[][..]),
    };
    let motivations = canonical_factors(&actor.motivations, motivation_overrides);
    let goals = canonical_factors(&actor.goals, goal_overrides);

    let factors = TefFactors {
        threat_ability: ability.ability,
        motivation_score: aggregate(&motivations),
        goal_score: aggregate(&goals),
        location_match: attribute_match(&actor.location, &organization.location),
        sector_match: attribute_match(&actor.sector, &organization.sector),
    };
    let tef = factors.tef();

    tracing::debug!(
        event = crate::logging::event_names::SCORE_TEF,
        actor = %actor.id,
        ability = factors.threat_ability,
        motivation = factors.motivation_score,
        goal = factors.goal_score,
        location = factors.location_match,
        sector = factors.sector_match,
        tef,
        "scored threat actor"
    );

    TefBreakdown {
        threat_actor_id: actor.id.clone(),
        threat_actor_name: actor.name.clone(),
        sophistication_score: ability.sophistication_score,
        resource_score: ability.resource_score,
        weights,
        factors,
        tef,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_common::model::{FactorOverride, WeightedFactor};
    use rq_common::{PreferenceKey, RelevanceLevel, ResourceLevel, SophisticationLevel};

    #[test]
    fn product_of_factors() {
        let f = TefFactors {
            threat_ability: 0.6,
            motivation_score: 0.4,
            goal_score: 0.5,
            location_match: 1.0,
            sector_match: 1.0,
        };
        assert!((f.tef() - 0.12).abs() < 1e-12);
    }

    #[test]
    fn location_mismatch_collapses() {
        let f = TefFactors {
            threat_ability: 1.0,
            motivation_score: 1.0,
            goal_score: 1.0,
            location_match: 0.0,
            sector_match: 1.0,
        };
        assert_eq!(f.tef(), 0.0);
    }

    #[test]
    fn match_is_exact() {
        assert_eq!(attribute_match("EU", "EU"), 1.0);
        assert_eq!(attribute_match("EU", "eu"), 0.0);
        assert_eq!(attribute_match("", ""), 1.0);
    }

    fn actor() -> ThreatActor {
        ThreatActor {
            id: "apt".into(),
            name: "APT".into(),
            sophistication_level: Some(SophisticationLevel::Strategic),
            resource_level: Some(ResourceLevel::Government),
            location: "EU".into(),
            sector: "Finance".into(),
            motivations: vec![WeightedFactor::new("m1", "Money", Some(RelevanceLevel::High), 1.0)],
            goals: vec![
                WeightedFactor::new("g1", "Theft", Some(RelevanceLevel::VeryHigh), 0.5),
                WeightedFactor::new("g2", "Chaos", Some(RelevanceLevel::Low), 0.5),
            ],
        }
    }

    fn org() -> Organization {
        Organization {
            id: "org".into(),
            name: "Org".into(),
            location: "EU".into(),
            sector: "Finance".into(),
        }
    }

    #[test]
    fn scores_without_preference() {
        let b = score_threat_actor(&actor(), &org(), None, SophisticationResourceWeights::default());
        // 1.0 × 0.8 × 0.6 × 1 × 1
        assert!((b.tef - 0.48).abs() < 1e-12);
        assert_eq!(b.factors.location_match, 1.0);
    }

    #[test]
    fn preference_overrides_apply() {
        let mut pref = UserPreference::new(PreferenceKey::threat_actor("u".into(), "apt".into()));
        pref.sophistication_resource_weights = Some(SophisticationResourceWeights {
            sophistication: 0.5,
            resource: 0.0,
        });
        pref.motivation_analysis = vec![FactorOverride::new(
            "m1".into(),
            Some(RelevanceLevel::VeryHigh),
            None,
        )];
        let b = score_threat_actor(
            &actor(),
            &org(),
            Some(&pref),
            SophisticationResourceWeights::default(),
        );
        // 0.5 × 1.0 × 0.6
        assert!((b.tef - 0.3).abs() < 1e-12);
    }
}
