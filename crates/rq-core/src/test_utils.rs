//! Test utilities for rq-core.
//!
//! Builders for scenario records, fixture loading and a few float
//! assertions shared by unit and integration tests.

use std::path::{Path, PathBuf};

use rq_common::model::{
    Asset, Budget, Control, ControlCosts, InteractionEffectRecord, Organization, ThreatActor,
    UserPreference, Vulnerability, WeightedFactor,
};
use rq_common::{
    OrganizationId, PreferenceKey, RelevanceLevel, ResourceLevel, SophisticationLevel, UserId,
};

use crate::pipeline::Scenario;

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that two floating point numbers are approximately equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {
        $crate::assert_approx_eq!($a, $b, 1e-9_f64)
    };
    ($a:expr, $b:expr, $epsilon:expr) => {{
        let a: f64 = $a;
        let b: f64 = $b;
        let eps: f64 = $epsilon;
        let diff = (a - b).abs();
        if diff > eps {
            panic!(
                "assertion failed: |{} - {}| = {} > {}",
                a, b, diff, eps
            );
        }
    }};
}

pub const TEST_USER: &str = "user-1";
pub const TEST_ORG: &str = "org-1";

/// Directory holding the JSON fixtures under `tests/fixtures`.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Load and parse a scenario fixture, panicking with the path on failure.
pub fn load_scenario(name: &str) -> Scenario {
    let path = fixture_path(name);
    match Scenario::from_file(&path) {
        Ok(s) => s,
        Err(e) => panic!("fixture {} failed to load: {}", path.display(), e),
    }
}

pub fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(value).expect("serialize fixture");
    std::fs::write(&path, text).expect("write fixture");
    path
}

pub fn factor(id: &str, level: RelevanceLevel, weight: f64) -> WeightedFactor {
    WeightedFactor::new(id, id, Some(level), weight)
}

/// Builder for threat actors.
#[derive(Debug, Clone)]
pub struct ActorBuilder {
    actor: ThreatActor,
}

impl ActorBuilder {
    pub fn new(id: &str) -> Self {
        ActorBuilder {
            actor: ThreatActor {
                id: id.into(),
                name: id.to_string(),
                sophistication_level: None,
                resource_level: None,
                location: String::new(),
                sector: String::new(),
                motivations: Vec::new(),
                goals: Vec::new(),
            },
        }
    }

    pub fn levels(mut self, soph: SophisticationLevel, res: ResourceLevel) -> Self {
        self.actor.sophistication_level = Some(soph);
        self.actor.resource_level = Some(res);
        self
    }

    pub fn located(mut self, location: &str, sector: &str) -> Self {
        self.actor.location = location.to_string();
        self.actor.sector = sector.to_string();
        self
    }

    pub fn motivation(mut self, id: &str, level: RelevanceLevel, weight: f64) -> Self {
        self.actor.motivations.push(factor(id, level, weight));
        self
    }

    pub fn goal(mut self, id: &str, level: RelevanceLevel, weight: f64) -> Self {
        self.actor.goals.push(factor(id, level, weight));
        self
    }

    pub fn build(self) -> ThreatActor {
        self.actor
    }
}

pub fn organization(location: &str, sector: &str) -> Organization {
    Organization {
        id: TEST_ORG.into(),
        name: "Example Org".to_string(),
        location: location.to_string(),
        sector: sector.to_string(),
    }
}

pub fn asset(id: &str, value: f64, vulns: &[(&str, f64)]) -> Asset {
    Asset {
        id: id.into(),
        name: id.to_string(),
        value,
        organization_id: Some(TEST_ORG.into()),
        vulnerabilities: vulns
            .iter()
            .map(|(vid, cvss)| Vulnerability {
                id: (*vid).into(),
                name: vid.to_string(),
                cvss: *cvss,
            })
            .collect(),
    }
}

pub fn control(name: &str, cost: f64, risk_reduction: f64, selected: bool) -> Control {
    Control {
        name: name.into(),
        costs: ControlCosts {
            purchase: cost,
            ..ControlCosts::default()
        },
        included: selected.into(),
        risk_reduction,
        residual_probability: 0.0,
        residual_risk: 0.0,
    }
}

pub fn interaction(a: &str, b: &str, effect: f64) -> InteractionEffectRecord {
    InteractionEffectRecord {
        organization_id: TEST_ORG.into(),
        control_a: a.into(),
        control_b: b.into(),
        interaction_effect: Some(effect),
    }
}

pub fn actor_key(actor: &str) -> PreferenceKey {
    PreferenceKey::threat_actor(TEST_USER.into(), actor.into())
}

pub fn assets_key() -> PreferenceKey {
    PreferenceKey::organization_assets(TEST_USER.into(), OrganizationId::from(TEST_ORG))
}

/// Builder for whole scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn new(org: Organization) -> Self {
        ScenarioBuilder {
            scenario: Scenario {
                schema_version: rq_common::SCHEMA_VERSION.to_string(),
                user_id: UserId::from(TEST_USER),
                organization: org,
                threat_actors: Vec::new(),
                selected_threat_actor: None,
                preferences: Vec::new(),
                assets: Vec::new(),
                custom_loss_types: Vec::new(),
                loss_amounts: Vec::new(),
                controls: Vec::new(),
                interactions: Vec::new(),
                budget: None,
            },
        }
    }

    pub fn actor(mut self, actor: ThreatActor) -> Self {
        self.scenario.threat_actors.push(actor);
        self
    }

    pub fn select(mut self, actor: &str) -> Self {
        self.scenario.selected_threat_actor = Some(actor.into());
        self
    }

    pub fn asset(mut self, asset: Asset) -> Self {
        self.scenario.assets.push(asset);
        self
    }

    /// Set a vulnerability likelihood on the organization-assets preference.
    pub fn vulnerability_level(mut self, vuln: &str, level: RelevanceLevel) -> Self {
        let key = assets_key();
        let idx = match self.scenario.preferences.iter().position(|p| p.key == key) {
            Some(idx) => idx,
            None => {
                self.scenario.preferences.push(UserPreference::new(key));
                self.scenario.preferences.len() - 1
            }
        };
        self.scenario.preferences[idx].set_vulnerability_level(vuln.into(), Some(level));
        self
    }

    pub fn preference(mut self, pref: UserPreference) -> Self {
        self.scenario.preferences.push(pref);
        self
    }

    pub fn loss(mut self, asset: &str, loss_type: &str, amount: f64) -> Self {
        self.scenario
            .loss_amounts
            .push(rq_common::model::LossAmount {
                asset_id: asset.into(),
                loss_type_id: loss_type.into(),
                amount,
            });
        self
    }

    pub fn control(mut self, control: Control) -> Self {
        self.scenario.controls.push(control);
        self
    }

    pub fn interaction(mut self, record: InteractionEffectRecord) -> Self {
        self.scenario.interactions.push(record);
        self
    }

    pub fn budget(mut self, total: f64) -> Self {
        self.scenario.budget = Some(Budget {
            user_id: TEST_USER.into(),
            organization_id: TEST_ORG.into(),
            total_budget: total,
        });
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}

/// A small scenario with one matching actor, two assets and two controls.
pub fn sample_scenario() -> Scenario {
    ScenarioBuilder::new(organization("US", "Finance"))
        .actor(
            ActorBuilder::new("apt-1")
                .levels(SophisticationLevel::Advanced, ResourceLevel::Team)
                .located("US", "Finance")
                .motivation("m-1", RelevanceLevel::High, 0.6)
                .motivation("m-2", RelevanceLevel::Low, 0.4)
                .goal("g-1", RelevanceLevel::VeryHigh, 1.0)
                .build(),
        )
        .select("apt-1")
        .asset(asset("db", 100_000.0, &[("v-1", 8.0), ("v-2", 6.0)]))
        .asset(asset("web", 50_000.0, &[("v-3", 5.0)]))
        .vulnerability_level("v-1", RelevanceLevel::High)
        .vulnerability_level("v-3", RelevanceLevel::Moderate)
        .loss("db", "fines", 20_000.0)
        .loss("web", "reputation", 5_000.0)
        .control(control("mfa", 10_000.0, 0.3, true))
        .control(control("edr", 25_000.0, 0.2, true))
        .control(control("waf", 8_000.0, 0.1, false))
        .interaction(interaction("mfa", "edr", 0.1))
        .budget(40_000.0)
        .build()
}
