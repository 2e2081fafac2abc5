//! Scenario evaluation: TEF → LEF → PLM/SLM → total risk → controls → budget.

use std::path::Path;

use rq_common::model::{
    Asset, Budget, Control, InteractionEffectRecord, LossAmount, LossType, Organization,
    ThreatActor, UserPreference,
};
use rq_common::{PreferenceKey, ThreatActorId, UserId};
use rq_config::RiskQuantConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget;
use crate::controls::{evaluate_portfolio, InteractionMatrix};
use crate::logging::{event_names, LogContext, Stage};
use crate::loss::{LedgerError, LossLedger};
use crate::report::RiskReport;
use crate::repository::{MemoryRepository, PreferenceRepository, RepositoryError};
use crate::risk;
use crate::scoring::score_threat_actor;
use crate::session::{DerivedSnapshot, DerivedState, KeyValueStore, StoreError};

/// Everything one evaluation needs, as exported from the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub user_id: UserId,
    pub organization: Organization,
    #[serde(default)]
    pub threat_actors: Vec<ThreatActor>,
    #[serde(default)]
    pub selected_threat_actor: Option<ThreatActorId>,
    #[serde(default)]
    pub preferences: Vec<UserPreference>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub custom_loss_types: Vec<LossType>,
    #[serde(default)]
    pub loss_amounts: Vec<LossAmount>,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub interactions: Vec<InteractionEffectRecord>,
    #[serde(default)]
    pub budget: Option<Budget>,
}

fn default_schema_version() -> String {
    rq_common::SCHEMA_VERSION.to_string()
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read scenario {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported scenario schema version {0}")]
    SchemaVersion(String),
    #[error("threat actor {0} not found in scenario")]
    UnknownThreatActor(ThreatActorId),
    #[error("loss data: {0}")]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PipelineError> for rq_common::Error {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Read { source, .. } => rq_common::Error::Io(source),
            PipelineError::UnknownThreatActor(id) => rq_common::Error::ThreatActorNotFound {
                id: id.to_string(),
            },
            PipelineError::Repository(r) => r.into(),
            PipelineError::Store(s) => s.into(),
            other => rq_common::Error::InvalidInput(other.to_string()),
        }
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_json(&content)
    }

    pub fn parse_json(json: &str) -> Result<Self, PipelineError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        let major = |v: &str| v.split('.').next().map(str::to_string);
        if major(&scenario.schema_version) != major(rq_common::SCHEMA_VERSION) {
            return Err(PipelineError::SchemaVersion(scenario.schema_version));
        }
        Ok(scenario)
    }

    /// Actor to score: the explicit choice, then the scenario's selection,
    /// then the first listed actor.
    pub fn pick_threat_actor(
        &self,
        requested: Option<&ThreatActorId>,
    ) -> Result<Option<&ThreatActor>, PipelineError> {
        let wanted = requested.or(self.selected_threat_actor.as_ref());
        match wanted {
            Some(id) => self
                .threat_actors
                .iter()
                .find(|a| &a.id == id)
                .map(Some)
                .ok_or_else(|| PipelineError::UnknownThreatActor(id.clone())),
            None => Ok(self.threat_actors.first()),
        }
    }

    /// Assets of the scenario's organization. Assets without an owner are
    /// taken to belong to it.
    pub fn organization_assets(&self) -> Vec<Asset> {
        self.assets
            .iter()
            .filter(|a| {
                a.organization_id
                    .as_ref()
                    .map_or(true, |org| org == &self.organization.id)
            })
            .cloned()
            .collect()
    }

    /// In-memory repository preloaded with the scenario's records.
    pub fn repository(&self) -> MemoryRepository {
        let mut repo = MemoryRepository::new();
        for preference in &self.preferences {
            repo = repo.with_preference(preference.clone());
        }
        for record in &self.interactions {
            if record.organization_id == self.organization.id {
                repo = repo.with_interaction(record.clone());
            }
        }
        repo
    }

    pub fn loss_ledger(&self, config: &RiskQuantConfig) -> Result<LossLedger, LedgerError> {
        let mut ledger = LossLedger::from_defaults(&config.loss_types);
        for loss_type in &self.custom_loss_types {
            ledger.merge_stored(LossType {
                is_custom: true,
                ..loss_type.clone()
            });
        }
        for amount in &self.loss_amounts {
            ledger.set_amount(&amount.asset_id, &amount.loss_type_id, amount.amount)?;
        }
        Ok(ledger)
    }
}

/// Vulnerability levels for scoring: the actor preference's level when it has
/// one, else the organization-wide asset preference's level.
fn vulnerability_levels(
    key: PreferenceKey,
    actor_pref: Option<&UserPreference>,
    assets_pref: Option<&UserPreference>,
) -> UserPreference {
    let mut merged = UserPreference::new(key);
    let sources = [assets_pref, actor_pref];
    for pref in sources.into_iter().flatten() {
        for entry in &pref.common_vulnerabilities_level {
            if entry.level.is_some() {
                merged.set_vulnerability_level(entry.vulnerability_id.clone(), entry.level);
            }
        }
    }
    merged
}

/// Run the full pipeline over a scenario.
pub fn evaluate(
    scenario: &Scenario,
    config: &RiskQuantConfig,
    requested_actor: Option<&ThreatActorId>,
    ctx: &LogContext,
) -> Result<RiskReport, PipelineError> {
    crate::log_event!(
        ctx,
        INFO,
        event_names::EVALUATE_STARTED,
        Stage::Load,
        "evaluating scenario",
        organization = %scenario.organization.id,
        actors = scenario.threat_actors.len(),
        assets = scenario.assets.len(),
        controls = scenario.controls.len()
    );

    let repo = scenario.repository();
    let org = &scenario.organization;
    let assets_key = PreferenceKey::organization_assets(scenario.user_id.clone(), org.id.clone());
    let assets_pref = repo.get(&assets_key)?;

    let default_weights = rq_common::model::SophisticationResourceWeights {
        sophistication: config.ability_weights.sophistication,
        resource: config.ability_weights.resource,
    };

    let actor = scenario.pick_threat_actor(requested_actor)?;
    let (threat, actor_pref) = match actor {
        Some(actor) => {
            let key = PreferenceKey::threat_actor(scenario.user_id.clone(), actor.id.clone());
            let pref = repo.get(&key)?;
            let breakdown = score_threat_actor(actor, org, pref.as_ref(), default_weights);
            crate::log_event!(
                ctx,
                DEBUG,
                event_names::SCORE_ACTOR_SELECTED,
                Stage::Score,
                "threat actor scored",
                actor = %actor.id,
                tef = breakdown.tef
            );
            (Some(breakdown), pref)
        }
        None => {
            tracing::warn!("scenario has no threat actors, TEF is 0");
            (None, None)
        }
    };
    let tef = threat.as_ref().map(|t| t.tef).unwrap_or(0.0);

    let levels = vulnerability_levels(assets_key, actor_pref.as_ref(), assets_pref.as_ref());
    let assets = scenario.organization_assets();
    let ledger = scenario.loss_ledger(config)?;
    let assessment = risk::assess(&assets, &ledger, &levels, tef);
    crate::log_event!(
        ctx,
        DEBUG,
        event_names::LOSS_COMPUTED,
        Stage::Loss,
        "loss magnitude computed",
        plm = assessment.primary_loss_magnitude,
        slm = assessment.secondary_loss_magnitude,
        total_lef = assessment.total_lef
    );

    let control_names = scenario.controls.iter().map(|c| c.name.clone());
    let records = crate::repository::InteractionRepository::list(&repo, &org.id)?;
    let matrix = InteractionMatrix::from_records(control_names, &records);
    let portfolio = evaluate_portfolio(assessment.total_risk, &scenario.controls, &matrix);

    let budget_summary = budget::summarize_record(
        scenario.budget.as_ref(),
        portfolio.total_cost,
        &config.budget,
    );
    crate::log_event!(
        ctx,
        DEBUG,
        event_names::BUDGET_EVALUATED,
        Stage::Controls,
        "budget evaluated",
        status = %budget_summary.status,
        utilization_pct = budget_summary.utilization_pct
    );

    let derived = DerivedSnapshot {
        tef,
        total_lef: assessment.total_lef,
        total_risk: assessment.total_risk,
        selected_threat_actor_id: threat.as_ref().map(|t| t.threat_actor_id.clone()),
    };

    crate::log_event!(
        ctx,
        INFO,
        event_names::EVALUATE_FINISHED,
        Stage::Report,
        "evaluation finished",
        tef = derived.tef,
        total_risk = derived.total_risk,
        selected_controls = portfolio.controls.len()
    );

    Ok(RiskReport {
        schema_version: rq_common::SCHEMA_VERSION.to_string(),
        generated_at: chrono::Utc::now(),
        run_id: ctx.run_id.clone(),
        organization_id: org.id.clone(),
        threat,
        risk: assessment,
        portfolio,
        interaction_matrix: matrix.rows(),
        budget: budget_summary,
        derived,
        config: None,
    })
}

/// Write the report's derived values to the shared store.
pub fn persist<S: KeyValueStore>(
    report: &RiskReport,
    state: &mut DerivedState<S>,
    ctx: &LogContext,
) -> Result<(), StoreError> {
    state.record(&report.derived)?;
    crate::log_event!(
        ctx,
        INFO,
        event_names::STATE_PERSISTED,
        Stage::Persist,
        "derived state written",
        tef = report.derived.tef,
        total_lef = report.derived.total_lef,
        total_risk = report.derived.total_risk
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;

    fn minimal() -> &'static str {
        r#"{
            "userId": "u1",
            "organization": {"id": "org", "name": "Org", "location": "EU", "sector": "Finance"}
        }"#
    }

    #[test]
    fn minimal_scenario_evaluates_to_zero() {
        let scenario = Scenario::parse_json(minimal()).unwrap();
        let ctx = LogContext::new("run-test");
        let report = evaluate(&scenario, &RiskQuantConfig::default(), None, &ctx).unwrap();
        assert_eq!(report.derived, DerivedSnapshot::default());
        assert!(report.threat.is_none());
        assert_eq!(report.budget.status, budget::BudgetStatus::Unset);
    }

    #[test]
    fn unknown_actor_is_error() {
        let scenario = Scenario::parse_json(minimal()).unwrap();
        let ctx = LogContext::new("run-test");
        let err = evaluate(
            &scenario,
            &RiskQuantConfig::default(),
            Some(&"ghost".into()),
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownThreatActor(_)));
        let common: rq_common::Error = err.into();
        assert_eq!(common.code(), 21);
    }

    #[test]
    fn future_major_version_rejected() {
        let json = minimal().replacen('{', r#"{"schemaVersion": "2.0.0","#, 1);
        assert!(matches!(
            Scenario::parse_json(&json),
            Err(PipelineError::SchemaVersion(_))
        ));
    }

    #[test]
    fn persist_writes_derived_values() {
        let scenario = Scenario::parse_json(minimal()).unwrap();
        let ctx = LogContext::new("run-test");
        let mut report = evaluate(&scenario, &RiskQuantConfig::default(), None, &ctx).unwrap();
        report.derived.tef = 0.3;
        report.derived.total_risk = 4.0;
        let mut state = DerivedState::new(MemoryStore::new());
        persist(&report, &mut state, &ctx).unwrap();
        assert_eq!(state.tef().unwrap(), 0.3);
        assert_eq!(state.total_risk().unwrap(), 4.0);
    }

    #[test]
    fn actor_levels_win_over_asset_levels() {
        use rq_common::RelevanceLevel;
        let key = PreferenceKey::organization_assets("u".into(), "org".into());
        let mut assets_pref = UserPreference::new(key.clone());
        assets_pref.set_vulnerability_level("v1".into(), Some(RelevanceLevel::Low));
        assets_pref.set_vulnerability_level("v2".into(), Some(RelevanceLevel::Low));
        let mut actor_pref =
            UserPreference::new(PreferenceKey::threat_actor("u".into(), "a".into()));
        actor_pref.set_vulnerability_level("v1".into(), Some(RelevanceLevel::High));
        actor_pref.set_vulnerability_level("v2".into(), None);

        let merged = vulnerability_levels(key, Some(&actor_pref), Some(&assets_pref));
        assert_eq!(merged.vulnerability_level(&"v1".into()), Some(RelevanceLevel::High));
        assert_eq!(merged.vulnerability_level(&"v2".into()), Some(RelevanceLevel::Low));
    }
}
