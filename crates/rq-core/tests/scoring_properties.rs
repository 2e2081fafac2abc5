//! Property-based tests for scoring, weighting and control economics.

use proptest::prelude::*;
use rq_common::model::{Organization, ThreatActor, WeightedFactor};
use rq_common::{ControlName, RelevanceLevel, ResourceLevel, SophisticationLevel};
use rq_config::BudgetThresholds;
use rq_core::budget::{summarize, BudgetStatus};
use rq_core::controls::{rosi, InteractionMatrix};
use rq_core::preference::{FactorKind, FactorSet};
use rq_core::risk::total_risk;
use rq_core::scoring::{complementary_weights, score_threat_actor};

fn relevance() -> impl Strategy<Value = RelevanceLevel> {
    prop::sample::select(RelevanceLevel::ALL.to_vec())
}

fn sophistication() -> impl Strategy<Value = SophisticationLevel> {
    prop::sample::select(SophisticationLevel::ALL.to_vec())
}

fn resource() -> impl Strategy<Value = ResourceLevel> {
    prop::sample::select(ResourceLevel::ALL.to_vec())
}

/// Factors with positive weights summing to 1.
fn factors(prefix: &'static str) -> impl Strategy<Value = Vec<WeightedFactor>> {
    prop::collection::vec((relevance(), 0.01f64..10.0), 1..6).prop_map(move |raw| {
        let total: f64 = raw.iter().map(|(_, w)| w).sum();
        raw.into_iter()
            .enumerate()
            .map(|(i, (level, w))| {
                let id = format!("{prefix}-{i}");
                WeightedFactor::new(id.as_str(), id.as_str(), Some(level), w / total)
            })
            .collect()
    })
}

fn actor() -> impl Strategy<Value = ThreatActor> {
    (sophistication(), resource(), factors("m"), factors("g")).prop_map(
        |(soph, res, motivations, goals)| ThreatActor {
            id: "actor".into(),
            name: "actor".to_string(),
            sophistication_level: Some(soph),
            resource_level: Some(res),
            location: "US".to_string(),
            sector: "Finance".to_string(),
            motivations,
            goals,
        },
    )
}

fn org(location: &str) -> Organization {
    Organization {
        id: "org".into(),
        name: "org".to_string(),
        location: location.to_string(),
        sector: "Finance".to_string(),
    }
}

proptest! {
    #[test]
    fn tef_stays_in_unit_interval(actor in actor(), w1 in 0.0f64..=1.0) {
        let weights = complementary_weights(w1);
        let tef = score_threat_actor(&actor, &org("US"), None, weights).tef;
        prop_assert!((0.0..=1.0 + 1e-9).contains(&tef), "tef = {}", tef);
    }

    #[test]
    fn location_mismatch_zeroes_tef(actor in actor()) {
        let tef = score_threat_actor(&actor, &org("EU"), None, Default::default()).tef;
        prop_assert_eq!(tef, 0.0);
    }

    #[test]
    fn complementary_weights_sum_to_one(w1 in -5.0f64..5.0) {
        let w = complementary_weights(w1);
        prop_assert!((w.sophistication + w.resource - 1.0).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&w.sophistication));
    }

    #[test]
    fn redistribution_keeps_total_and_target(
        factors in factors("m"),
        pick in any::<prop::sample::Index>(),
        new_weight in 0.0f64..=1.0,
    ) {
        prop_assume!(factors.len() > 1);
        let target = factors[pick.index(factors.len())].id.clone();
        let mut set = FactorSet::new(FactorKind::Motivation, factors);
        set.set_weight(&target, new_weight).unwrap();

        let total: f64 = set.factors().iter().map(|f| f.weight).sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "total = {}", total);
        let got = set.get(&target).unwrap().weight;
        prop_assert!((got - new_weight).abs() < 1e-9, "target = {}", got);
        prop_assert!(set.factors().iter().all(|f| f.weight >= 0.0));
    }

    #[test]
    fn matrix_is_symmetric(
        a in "[a-e]",
        b in "[a-e]",
        value in 0.0f64..=1.0,
    ) {
        let (a, b) = (ControlName::from(a.as_str()), ControlName::from(b.as_str()));
        let mut m = InteractionMatrix::new([a.clone(), b.clone()]);
        let stored = m.set(&a, &b, value);
        if a == b {
            prop_assert!(stored.is_err());
            prop_assert_eq!(m.get(&a, &b), None);
        } else {
            prop_assert!(stored.is_ok());
            prop_assert_eq!(m.get(&a, &b), m.get(&b, &a));
            prop_assert_eq!(m.get(&b, &a), Some(value));
        }
    }

    #[test]
    fn rosi_sign_follows_net_gain(nrr in -1e6f64..1e6, cost in 1.0f64..1e6) {
        let r = rosi(nrr, cost);
        prop_assert_eq!(r > 0.0, nrr > cost);
    }

    #[test]
    fn total_risk_grows_with_lef(
        lef in 0.0f64..1.0,
        extra in 0.0f64..1.0,
        plm in 0.0f64..1e7,
        slm in 0.0f64..1e6,
    ) {
        prop_assert!(total_risk(lef + extra, plm, slm) >= total_risk(lef, plm, slm));
        prop_assert!(total_risk(lef, plm, slm) >= slm);
    }

    #[test]
    fn budget_over_iff_cost_exceeds_budget(budget in 1.0f64..1e6, cost in 0.0f64..2e6) {
        prop_assume!((cost - budget).abs() > 1e-6 * budget);
        let summary = summarize(budget, cost, &BudgetThresholds::default());
        prop_assert_eq!(summary.status == BudgetStatus::Over, cost > budget);
        prop_assert!((summary.remaining - (budget - cost)).abs() < 1e-6);
    }
}
