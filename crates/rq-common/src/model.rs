//! Records exchanged with the persistence service.
//!
//! Field names follow the service's camelCase JSON. Optional numbers default
//! to zero and unknown level labels deserialize to `None`, so a partially
//! filled record still scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{
    AssetId, ControlName, FactorId, LossTypeId, OrganizationId, PreferenceKey, ThreatActorId,
    UserId, VulnerabilityId,
};
use crate::levels::{self, RelevanceLevel, ResourceLevel, SophisticationLevel};

/// A motivation or goal of a threat actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFactor {
    pub id: FactorId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "levels::lenient")]
    pub relevance_level: Option<RelevanceLevel>,
    #[serde(default)]
    pub weight: f64,
}

impl WeightedFactor {
    pub fn new(
        id: impl Into<FactorId>,
        name: impl Into<String>,
        relevance_level: Option<RelevanceLevel>,
        weight: f64,
    ) -> Self {
        WeightedFactor {
            id: id.into(),
            name: name.into(),
            relevance_level,
            weight,
        }
    }
}

/// Threat actor as delivered by the threat catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatActor {
    pub id: ThreatActorId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "levels::lenient")]
    pub sophistication_level: Option<SophisticationLevel>,
    #[serde(default, deserialize_with = "levels::lenient")]
    pub resource_level: Option<ResourceLevel>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub motivations: Vec<WeightedFactor>,
    #[serde(default)]
    pub goals: Vec<WeightedFactor>,
}

/// The organization being assessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub sector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: VulnerabilityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "cvssScore")]
    pub cvss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    #[serde(default)]
    pub name: String,
    /// Asset value in $ millions.
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Secondary loss category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossType {
    pub id: LossTypeId,
    pub label: String,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Recorded amount for one (asset, loss type) pair, in $ millions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossAmount {
    pub asset_id: AssetId,
    pub loss_type_id: LossTypeId,
    #[serde(default)]
    pub amount: f64,
}

/// Sophistication vs resource weighting for threat ability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SophisticationResourceWeights {
    #[serde(alias = "w1")]
    pub sophistication: f64,
    #[serde(alias = "w2")]
    pub resource: f64,
}

impl Default for SophisticationResourceWeights {
    fn default() -> Self {
        Self {
            sophistication: 0.5,
            resource: 0.5,
        }
    }
}

/// Reference to a factor inside a preference override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorRef {
    pub id: FactorId,
    #[serde(default)]
    pub name: String,
}

/// A user's override of a motivation or goal.
///
/// The service sends either a flat `motivationId`/`goalId` or a nested
/// `motivation`/`goal` object; both land here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorOverride {
    #[serde(
        default,
        alias = "motivationId",
        alias = "goalId",
        skip_serializing_if = "Option::is_none"
    )]
    pub factor_id: Option<FactorId>,
    #[serde(
        default,
        alias = "motivation",
        alias = "goal",
        skip_serializing_if = "Option::is_none"
    )]
    pub factor: Option<FactorRef>,
    #[serde(default, deserialize_with = "levels::lenient")]
    pub relevance_level: Option<RelevanceLevel>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl FactorOverride {
    /// Flat override for a factor id.
    pub fn new(id: FactorId, relevance_level: Option<RelevanceLevel>, weight: Option<f64>) -> Self {
        FactorOverride {
            factor_id: Some(id),
            factor: None,
            relevance_level,
            weight,
        }
    }

    /// The factor this override applies to, whichever shape carried it.
    pub fn target(&self) -> Option<&FactorId> {
        self.factor_id
            .as_ref()
            .or_else(|| self.factor.as_ref().map(|f| &f.id))
    }
}

/// User-assigned likelihood level for a vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityLevel {
    pub vulnerability_id: VulnerabilityId,
    #[serde(default, deserialize_with = "levels::lenient")]
    pub level: Option<RelevanceLevel>,
}

/// Persisted per-(user, subject) preference record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    pub key: PreferenceKey,
    #[serde(default)]
    pub sophistication_resource_weights: Option<SophisticationResourceWeights>,
    #[serde(default)]
    pub motivation_analysis: Vec<FactorOverride>,
    #[serde(default)]
    pub goals_analysis: Vec<FactorOverride>,
    #[serde(default)]
    pub common_vulnerabilities_level: Vec<VulnerabilityLevel>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserPreference {
    /// Empty preference, not yet persisted.
    pub fn new(key: PreferenceKey) -> Self {
        UserPreference {
            key,
            sophistication_resource_weights: None,
            motivation_analysis: Vec::new(),
            goals_analysis: Vec::new(),
            common_vulnerabilities_level: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn vulnerability_level(&self, id: &VulnerabilityId) -> Option<RelevanceLevel> {
        self.common_vulnerabilities_level
            .iter()
            .find(|v| &v.vulnerability_id == id)
            .and_then(|v| v.level)
    }

    /// Insert or replace the level for a vulnerability.
    pub fn set_vulnerability_level(&mut self, id: VulnerabilityId, level: Option<RelevanceLevel>) {
        match self
            .common_vulnerabilities_level
            .iter_mut()
            .find(|v| v.vulnerability_id == id)
        {
            Some(entry) => entry.level = level,
            None => self.common_vulnerabilities_level.push(VulnerabilityLevel {
                vulnerability_id: id,
                level,
            }),
        }
    }
}

/// Whether a control is part of the selected control set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Inclusion {
    #[serde(alias = "yes", alias = "YES")]
    Yes,
    #[default]
    #[serde(alias = "no", alias = "NO")]
    No,
}

impl Inclusion {
    pub fn is_selected(self) -> bool {
        matches!(self, Inclusion::Yes)
    }
}

impl From<bool> for Inclusion {
    fn from(selected: bool) -> Self {
        if selected {
            Inclusion::Yes
        } else {
            Inclusion::No
        }
    }
}

/// The four cost categories of a control, in $ millions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlCosts {
    #[serde(default)]
    pub purchase: f64,
    #[serde(default)]
    pub operational: f64,
    #[serde(default)]
    pub training: f64,
    #[serde(default)]
    pub manpower: f64,
}

/// A candidate security control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub name: ControlName,
    #[serde(default)]
    pub costs: ControlCosts,
    #[serde(default)]
    pub included: Inclusion,
    /// Rd: fraction of baseline risk the control removes.
    #[serde(default)]
    pub risk_reduction: f64,
    /// Pnew: probability of the residual risk after the control.
    #[serde(default)]
    pub residual_probability: f64,
    /// Rnew: residual risk magnitude after the control.
    #[serde(default)]
    pub residual_risk: f64,
}

/// Stored pairwise interaction effect between two controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEffectRecord {
    pub organization_id: OrganizationId,
    pub control_a: ControlName,
    pub control_b: ControlName,
    #[serde(default)]
    pub interaction_effect: Option<f64>,
}

/// Total budget for an organization as seen by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub total_budget: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PreferenceKey;

    #[test]
    fn threat_actor_tolerates_unknown_levels() {
        let json = r#"{
            "id": "apt-1",
            "name": "Example",
            "sophisticationLevel": "Unheard Of",
            "resourceLevel": "Government",
            "location": "EU",
            "sector": "Finance",
            "motivations": [{"id": "m1", "name": "Money", "relevanceLevel": "High", "weight": 1.0}]
        }"#;
        let actor: ThreatActor = serde_json::from_str(json).unwrap();
        assert!(actor.sophistication_level.is_none());
        assert_eq!(actor.resource_level, Some(ResourceLevel::Government));
        assert_eq!(actor.motivations.len(), 1);
        assert!(actor.goals.is_empty());
    }

    #[test]
    fn factor_override_accepts_both_shapes() {
        let flat: FactorOverride =
            serde_json::from_str(r#"{"motivationId":"m1","relevanceLevel":"Low","weight":0.3}"#)
                .unwrap();
        let nested: FactorOverride = serde_json::from_str(
            r#"{"motivation":{"id":"m1","name":"Money"},"relevanceLevel":"Low","weight":0.3}"#,
        )
        .unwrap();
        assert_eq!(flat.target(), Some(&FactorId::from("m1")));
        assert_eq!(nested.target(), Some(&FactorId::from("m1")));
        assert_eq!(flat.relevance_level, nested.relevance_level);
    }

    #[test]
    fn inclusion_parses_yes_no() {
        let yes: Inclusion = serde_json::from_str("\"Yes\"").unwrap();
        let no: Inclusion = serde_json::from_str("\"no\"").unwrap();
        assert!(yes.is_selected());
        assert!(!no.is_selected());
    }

    #[test]
    fn vulnerability_level_upsert() {
        let key = PreferenceKey::threat_actor("u".into(), "a".into());
        let mut pref = UserPreference::new(key);
        pref.set_vulnerability_level("v1".into(), Some(RelevanceLevel::Low));
        pref.set_vulnerability_level("v1".into(), Some(RelevanceLevel::High));
        assert_eq!(pref.common_vulnerabilities_level.len(), 1);
        assert_eq!(pref.vulnerability_level(&"v1".into()), Some(RelevanceLevel::High));
        assert_eq!(pref.vulnerability_level(&"v2".into()), None);
    }

    #[test]
    fn vulnerability_accepts_cvss_score_alias() {
        let v: Vulnerability = serde_json::from_str(r#"{"id":"v1","cvssScore":7.5}"#).unwrap();
        assert_eq!(v.cvss, 7.5);
    }
}
