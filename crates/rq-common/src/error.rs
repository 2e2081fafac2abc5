//! Error types for Risk Quant.
//!
//! Scoring itself never fails: missing data resolves to numeric defaults.
//! Errors only arise at the boundaries (configuration, persistence, the
//! derived-state store, scenario input) and carry:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Save Failed
//!   Reason: persistence service unavailable
//!   Fix: The previous value was restored. Retry the edit once the service is reachable.
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Risk Quant operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Invalid scenario or edit input rejected at the boundary.
    Input,
    /// Persistence service errors (save, conflict, not found).
    Persistence,
    /// Derived-state store errors.
    Session,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Persistence => write!(f, "persistence"),
            ErrorCategory::Session => write!(f, "session"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Risk Quant.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("invalid configuration file: {0}")]
    InvalidConfig(String),

    // Input errors (20-29)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("threat actor {id} not found")]
    ThreatActorNotFound { id: String },

    // Persistence errors (40-49)
    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("a save is already in flight for {0}")]
    SaveInFlight(String),

    // Session errors (50-59)
    #[error("derived state store corrupted: {0}")]
    StoreCorrupted(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 40-49: Persistence errors
    /// - 50-59: Session errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidConfig(_) => 11,
            Error::InvalidInput(_) => 20,
            Error::ThreatActorNotFound { .. } => 21,
            Error::SaveFailed(_) => 40,
            Error::Conflict(_) => 41,
            Error::NotFound(_) => 42,
            Error::SaveInFlight(_) => 43,
            Error::StoreCorrupted(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidConfig(_) => ErrorCategory::Config,
            Error::InvalidInput(_) | Error::ThreatActorNotFound { .. } => ErrorCategory::Input,
            Error::SaveFailed(_)
            | Error::Conflict(_)
            | Error::NotFound(_)
            | Error::SaveInFlight(_) => ErrorCategory::Persistence,
            Error::StoreCorrupted(_) => ErrorCategory::Session,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::InvalidConfig(_) => true,
            Error::InvalidInput(_) => true,
            Error::ThreatActorNotFound { .. } => false,
            // Local state was rolled back; the edit can be retried.
            Error::SaveFailed(_) => true,
            Error::Conflict(_) => true,
            Error::NotFound(_) => false,
            Error::SaveInFlight(_) => true,
            Error::StoreCorrupted(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => {
                "Run 'rq-core check' to validate configuration, or remove risk_quant.json to use defaults."
            }
            Error::InvalidInput(_) => "Fix the scenario file and retry.",
            Error::ThreatActorNotFound { .. } => {
                "Pick a threat actor id present in the scenario's threatActors list."
            }
            Error::SaveFailed(_) => {
                "The previous value was restored. Retry the edit once the service is reachable."
            }
            Error::Conflict(_) => "Reload the record and apply the edit to the existing entry.",
            Error::NotFound(_) => "The record was deleted. Reload the page data.",
            Error::SaveInFlight(_) => "Wait for the pending save to settle before editing again.",
            Error::StoreCorrupted(_) => "Reset derived state with 'rq-core state reset'.",
            Error::Io(_) => "Check disk space and permissions, then retry.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "Invalid Configuration",
            Error::InvalidInput(_) => "Invalid Input",
            Error::ThreatActorNotFound { .. } => "Threat Actor Not Found",
            Error::SaveFailed(_) => "Save Failed",
            Error::Conflict(_) => "Duplicate Record",
            Error::NotFound(_) => "Record Not Found",
            Error::SaveInFlight(_) => "Save In Progress",
            Error::StoreCorrupted(_) => "Derived State Corrupted",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Format for a terminal.
    pub fn format_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }

    /// Structured representation for JSON output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "category": self.category(),
            "message": self.to_string(),
            "recoverable": self.is_recoverable(),
            "remediation": self.remediation(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        assert_eq!(Error::InvalidConfig("x".into()).code(), 11);
        assert_eq!(Error::SaveFailed("x".into()).code(), 40);
        assert_eq!(Error::SaveFailed("x".into()).category(), ErrorCategory::Persistence);
        assert_eq!(Error::StoreCorrupted("x".into()).category(), ErrorCategory::Session);
    }

    #[test]
    fn json_error_converts() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.code(), 61);
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn human_format_has_headline_and_fix() {
        let s = Error::SaveFailed("service unavailable".into()).format_human();
        assert!(s.starts_with("✗ Save Failed"));
        assert!(s.contains("Reason: save failed: service unavailable"));
        assert!(s.contains("Fix: The previous value was restored"));
    }

    #[test]
    fn to_json_shape() {
        let v = Error::Conflict("A/B".into()).to_json();
        assert_eq!(v["code"], 41);
        assert_eq!(v["category"], "persistence");
        assert_eq!(v["recoverable"], true);
    }
}
