//! Scoring configuration types.
//!
//! These types match the risk_quant.json file. Every section has defaults so
//! an empty object `{"schema_version": "1.0.0"}` is a complete config.

use serde::{Deserialize, Serialize};

/// Complete scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskQuantConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Sophistication/resource split used until a user saves their own.
    #[serde(default)]
    pub ability_weights: AbilityWeightDefaults,

    #[serde(default)]
    pub budget: BudgetThresholds,

    /// Loss types seeded into every organization's loss ledger.
    #[serde(default = "default_loss_types")]
    pub loss_types: Vec<DefaultLossType>,

    /// File name of the derived-state store inside the state directory.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl Default for RiskQuantConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            ability_weights: AbilityWeightDefaults::default(),
            budget: BudgetThresholds::default(),
            loss_types: default_loss_types(),
            state_file: default_state_file(),
        }
    }
}

impl RiskQuantConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::validate::ValidationError::IoError(e.to_string()))?;
        Self::parse_json(&content)
    }

    /// Parse from JSON text.
    pub fn parse_json(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| crate::validate::ValidationError::ParseError(e.to_string()))
    }
}

/// Default sophistication vs resource weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityWeightDefaults {
    pub sophistication: f64,
    pub resource: f64,
}

impl Default for AbilityWeightDefaults {
    fn default() -> Self {
        Self {
            sophistication: 0.5,
            resource: 0.5,
        }
    }
}

/// Budget status thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetThresholds {
    /// Utilization percentage at which the status turns to near-limit.
    #[serde(default = "default_near_limit_pct")]
    pub near_limit_pct: f64,
}

impl Default for BudgetThresholds {
    fn default() -> Self {
        Self {
            near_limit_pct: default_near_limit_pct(),
        }
    }
}

/// A built-in secondary loss category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultLossType {
    pub id: String,
    pub label: String,
}

fn default_near_limit_pct() -> f64 {
    90.0
}

fn default_state_file() -> String {
    "derived_state.json".to_string()
}

fn default_loss_types() -> Vec<DefaultLossType> {
    [
        ("productivity", "Productivity"),
        ("response", "Response"),
        ("replacement", "Replacement"),
        ("fines", "Fines & Judgements"),
        ("competitive_advantage", "Competitive Advantage"),
        ("reputation", "Reputation"),
    ]
    .into_iter()
    .map(|(id, label)| DefaultLossType {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}
