//! Threat scoring: ability, motivation/goal aggregation, and TEF composition.

pub mod ability;
pub mod aggregate;
pub mod tef;

pub use ability::{complementary_weights, threat_ability, ThreatAbility};
pub use aggregate::{aggregate, aggregate_with_overrides, relevance_value};
pub use tef::{attribute_match, compute_tef, score_threat_actor, TefBreakdown, TefFactors};
