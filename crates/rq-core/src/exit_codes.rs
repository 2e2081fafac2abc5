//! Exit codes for the rq-core CLI.
//!
//! - 0-9: evaluation outcomes
//! - 10-19: user or environment errors
//! - 20-29: file and serialization errors

use rq_common::ErrorCategory;

/// Stable process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded; selected controls fit the budget.
    Clean = 0,

    /// Evaluation succeeded but the selected controls exceed the budget.
    OverBudget = 1,

    /// Configuration missing or invalid.
    ConfigError = 11,

    /// Scenario file invalid or refers to unknown records.
    InputError = 12,

    /// Persistence service refused or lost a write; local state was rolled
    /// back and the edit can be retried.
    PersistenceError = 14,

    /// Derived-state store unreadable.
    SessionError = 15,

    /// Reading or writing a file failed.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Errors the caller can act on without a code change.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::OverBudget => "OK_OVER_BUDGET",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::PersistenceError => "ERR_PERSISTENCE",
            ExitCode::SessionError => "ERR_SESSION",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Exit code for a library error.
    pub fn for_error(err: &rq_common::Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Input => ExitCode::InputError,
            ErrorCategory::Session => ExitCode::SessionError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Persistence => ExitCode::PersistenceError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
