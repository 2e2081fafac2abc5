//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::scoring::RiskQuantConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a configuration semantically.
pub fn validate_config(config: &RiskQuantConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    let w = &config.ability_weights;
    validate_unit("ability_weights.sophistication", w.sophistication)?;
    validate_unit("ability_weights.resource", w.resource)?;
    let sum = w.sophistication + w.resource;
    if (sum - 1.0).abs() > 1e-6 {
        return Err(ValidationError::SemanticError(format!(
            "ability weights must sum to 1.0, got {} (sophistication={}, resource={})",
            sum, w.sophistication, w.resource
        )));
    }

    let pct = config.budget.near_limit_pct;
    if !pct.is_finite() || pct <= 0.0 || pct > 100.0 {
        return Err(ValidationError::InvalidValue {
            field: "budget.near_limit_pct".to_string(),
            message: format!("Must be in (0, 100], got {}", pct),
        });
    }

    let mut seen = std::collections::HashSet::new();
    let mut labels = std::collections::HashSet::new();
    for loss_type in &config.loss_types {
        if loss_type.id.trim().is_empty() || loss_type.label.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "loss_types".to_string(),
                message: "loss type id and label must be non-empty".to_string(),
            });
        }
        if !seen.insert(loss_type.id.as_str()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate loss type id: {}",
                loss_type.id
            )));
        }
        if !labels.insert(loss_type.label.trim().to_lowercase()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate loss type label: {}",
                loss_type.label.trim()
            )));
        }
    }

    if config.state_file.trim().is_empty()
        || config.state_file.contains('/')
        || config.state_file.contains('\\')
    {
        return Err(ValidationError::InvalidValue {
            field: "state_file".to_string(),
            message: format!("Must be a bare file name, got {:?}", config.state_file),
        });
    }

    Ok(())
}

fn validate_unit(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in [0, 1], got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::DefaultLossType;

    #[test]
    fn default_config_is_valid() {
        validate_config(&RiskQuantConfig::default()).unwrap();
    }

    #[test]
    fn rejects_version_mismatch() {
        let config = RiskQuantConfig {
            schema_version: "0.9.0".to_string(),
            ..RiskQuantConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = RiskQuantConfig::default();
        config.ability_weights.sophistication = 0.7;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), 63);
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let mut config = RiskQuantConfig::default();
        config.budget.near_limit_pct = 120.0;
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_loss_type_ids() {
        let mut config = RiskQuantConfig::default();
        config.loss_types.push(DefaultLossType {
            id: "reputation".to_string(),
            label: "Reputation again".to_string(),
        });
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::SemanticError(_))
        ));
    }

    #[test]
    fn rejects_loss_type_labels_differing_only_in_case() {
        let mut config = RiskQuantConfig::default();
        config.loss_types.push(DefaultLossType {
            id: "reputation_2".to_string(),
            label: " REPUTATION".to_string(),
        });
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), 63);
        assert!(err.to_string().contains("REPUTATION"));
    }

    #[test]
    fn rejects_state_file_with_path() {
        let config = RiskQuantConfig {
            state_file: "../escape.json".to_string(),
            ..RiskQuantConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
