//! Risk Quant configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for risk_quant.json
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation (weights sum to 1, thresholds in range)
//! - Config snapshots recorded alongside evaluation reports

pub mod resolve;
pub mod scoring;
pub mod snapshot;
pub mod validate;

pub use resolve::{
    hash_content, load_config, resolve_config, state_dir, ConfigPath, ConfigSource, LoadedConfig,
};
pub use scoring::{AbilityWeightDefaults, BudgetThresholds, DefaultLossType, RiskQuantConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
