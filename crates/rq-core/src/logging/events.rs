//! Structured event vocabulary.
//!
//! Every log line names a stable event and a pipeline stage, and carries the
//! run id of the invocation so lines from one evaluation can be grouped.

use serde::{Deserialize, Serialize};

/// Pipeline stage of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading the scenario.
    Load,
    /// Threat ability and TEF.
    Score,
    /// Loss magnitude and LEF.
    Loss,
    /// Total risk roll-up.
    Risk,
    /// Control economics and budget.
    Controls,
    /// Writing derived state.
    Persist,
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Score => "score",
            Stage::Loss => "loss",
            Stage::Risk => "risk",
            Stage::Controls => "controls",
            Stage::Persist => "persist",
            Stage::Report => "report",
        })
    }
}

pub mod event_names {
    pub const EVALUATE_STARTED: &str = "evaluate.started";
    pub const EVALUATE_FINISHED: &str = "evaluate.finished";

    pub const SCENARIO_LOADED: &str = "scenario.loaded";

    pub const SCORE_TEF: &str = "score.tef";
    pub const SCORE_ACTOR_SELECTED: &str = "score.actor_selected";

    pub const LOSS_COMPUTED: &str = "loss.computed";
    pub const RISK_TOTAL: &str = "risk.total";

    pub const CONTROLS_EVALUATED: &str = "controls.evaluated";
    pub const BUDGET_EVALUATED: &str = "budget.evaluated";

    pub const STATE_PERSISTED: &str = "state.persisted";
    pub const STATE_RESET: &str = "state.reset";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";

    pub const COMMAND_FAILED: &str = "command.failed";
}

/// Correlation ids shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub session_id: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
