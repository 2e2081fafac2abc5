//! Configuration snapshots for evaluation reports.
//!
//! A snapshot captures the exact configuration a report was computed with,
//! so a figure can be traced back to its weights and thresholds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resolve::LoadedConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 of the config file (None for built-in defaults).
    #[serde(default)]
    pub config_hash: Option<String>,

    /// Path the config was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Source of the configuration.
    pub config_source: String,

    pub ability_weights: (f64, f64),

    pub near_limit_pct: f64,

    pub loss_type_count: usize,
}

impl ConfigSnapshot {
    pub fn capture(loaded: &LoadedConfig) -> Self {
        let config = &loaded.config;
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_hash: loaded.content_hash.clone(),
            config_path: loaded.path.as_ref().map(|p| p.display().to_string()),
            config_source: loaded.source.to_string(),
            ability_weights: (
                config.ability_weights.sophistication,
                config.ability_weights.resource,
            ),
            near_limit_pct: config.budget.near_limit_pct,
            loss_type_count: config.loss_types.len(),
        }
    }
}
