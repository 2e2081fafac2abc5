//! Per-entity save state.
//!
//! An entity being saved refuses background reloads until the save either
//! commits or rolls back, so a slow reload cannot overwrite a local edit.

use serde::Serialize;
use thiserror::Error;

/// Save lifecycle of one edited entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed { reason: String },
}

impl SaveState {
    pub fn is_saving(&self) -> bool {
        matches!(self, SaveState::Saving)
    }

    /// Settled states accept a new save and incoming reloads.
    pub fn is_settled(&self) -> bool {
        !self.is_saving()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("a save is already in flight")]
    AlreadySaving,
    #[error("no save in flight")]
    NotSaving,
}

impl From<SaveError> for rq_common::Error {
    fn from(e: SaveError) -> Self {
        rq_common::Error::SaveInFlight(e.to_string())
    }
}

/// Tracks the save state of a single entity.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    state: SaveState,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    /// Enter `Saving`. Overlapping saves are rejected.
    pub fn begin(&mut self) -> Result<(), SaveError> {
        if self.state.is_saving() {
            return Err(SaveError::AlreadySaving);
        }
        self.state = SaveState::Saving;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), SaveError> {
        self.settle(SaveState::Saved)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), SaveError> {
        self.settle(SaveState::Failed {
            reason: reason.into(),
        })
    }

    /// Whether a background reload may replace local state now.
    pub fn can_accept_reload(&self) -> bool {
        self.state.is_settled()
    }

    /// Back to `Idle` once the outcome has been shown.
    pub fn acknowledge(&mut self) {
        if self.state.is_settled() {
            self.state = SaveState::Idle;
        }
    }

    fn settle(&mut self, next: SaveState) -> Result<(), SaveError> {
        if !self.state.is_saving() {
            return Err(SaveError::NotSaving);
        }
        self.state = next;
        Ok(())
    }
}
