//! Cell editing for the interaction matrix.
//!
//! ```text
//! Idle → Editing(row, col) → Saving → Idle   (saved)
//!                          → Idle            (cancelled)
//!                 Saving   → Idle            (save failed, cell restored)
//! ```
//!
//! `commit` runs the save in one call. Callers that send the record
//! themselves use `begin_commit` / `finish_commit`; reloads offered in
//! between are refused.

use rq_common::model::InteractionEffectRecord;
use rq_common::{ControlName, OrganizationId};
use serde::Serialize;
use thiserror::Error;

use super::interaction::{InteractionMatrix, MatrixError};
use crate::repository::{upsert_interaction, InteractionRepository, RepositoryError};
use crate::sync::{SaveError, SaveState, SaveTracker};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CellEditState {
    #[default]
    Idle,
    Editing {
        row: ControlName,
        col: ControlName,
        original: Option<f64>,
        draft: Option<f64>,
    },
    Saving {
        row: ControlName,
        col: ControlName,
        original: Option<f64>,
        value: f64,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditError {
    #[error("control {0} cannot interact with itself")]
    Diagonal(ControlName),
    #[error("another cell is being edited")]
    Busy,
    #[error("no cell is being edited")]
    NotEditing,
    #[error("no cell save in flight")]
    NotSaving,
    #[error("interaction effect must be within [0, 1], got {0}")]
    OutOfRange(f64),
    #[error("save failed, cell restored: {0}")]
    SaveFailed(#[source] RepositoryError),
}

impl From<MatrixError> for EditError {
    fn from(e: MatrixError) -> Self {
        match e {
            MatrixError::Diagonal(c) => EditError::Diagonal(c),
            MatrixError::OutOfRange(v) => EditError::OutOfRange(v),
        }
    }
}

impl From<EditError> for rq_common::Error {
    fn from(e: EditError) -> Self {
        match e {
            EditError::SaveFailed(inner) => rq_common::Error::SaveFailed(inner.to_string()),
            EditError::Busy | EditError::NotSaving => {
                rq_common::Error::SaveInFlight(format!("interaction matrix: {e}"))
            }
            other => rq_common::Error::InvalidInput(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EditOutcome {
    Saved { previous: Option<f64>, value: f64 },
    /// Committed without a draft value.
    Unchanged,
}

/// Owns the matrix of one organization and the edit state of its cells.
#[derive(Debug, Clone)]
pub struct MatrixEditor {
    organization_id: OrganizationId,
    matrix: InteractionMatrix,
    state: CellEditState,
    tracker: SaveTracker,
}

impl MatrixEditor {
    pub fn new(organization_id: OrganizationId, matrix: InteractionMatrix) -> Self {
        MatrixEditor {
            organization_id,
            matrix,
            state: CellEditState::Idle,
            tracker: SaveTracker::new(),
        }
    }

    /// Load every stored record of the organization.
    pub fn load<R, I>(
        repo: &R,
        organization_id: OrganizationId,
        controls: I,
    ) -> Result<Self, RepositoryError>
    where
        R: InteractionRepository + ?Sized,
        I: IntoIterator<Item = ControlName>,
    {
        let records = repo.list(&organization_id)?;
        let matrix = InteractionMatrix::from_records(controls, &records);
        Ok(Self::new(organization_id, matrix))
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn state(&self) -> &CellEditState {
        &self.state
    }

    pub fn save_state(&self) -> &SaveState {
        self.tracker.state()
    }

    pub fn begin_edit(&mut self, row: &ControlName, col: &ControlName) -> Result<(), EditError> {
        if !matches!(self.state, CellEditState::Idle) {
            return Err(EditError::Busy);
        }
        if row == col {
            return Err(EditError::Diagonal(row.clone()));
        }
        self.state = CellEditState::Editing {
            row: row.clone(),
            col: col.clone(),
            original: self.matrix.get(row, col),
            draft: None,
        };
        Ok(())
    }

    pub fn set_draft(&mut self, value: f64) -> Result<(), EditError> {
        let CellEditState::Editing { draft, .. } = &mut self.state else {
            return Err(EditError::NotEditing);
        };
        if !(0.0..=1.0).contains(&value) {
            return Err(EditError::OutOfRange(value));
        }
        *draft = Some(value);
        Ok(())
    }

    /// Drop the edit. The matrix is not touched.
    pub fn cancel(&mut self) {
        if let CellEditState::Editing { .. } = self.state {
            self.state = CellEditState::Idle;
        }
    }

    /// Apply the draft and persist it. A failed save puts the original value
    /// back, for both orientations of the pair.
    pub fn commit<R>(&mut self, repo: &mut R) -> Result<EditOutcome, EditError>
    where
        R: InteractionRepository + ?Sized,
    {
        match self.begin_commit()? {
            Some(record) => {
                let result = upsert_interaction(repo, &record);
                self.finish_commit(result)
            }
            None => Ok(EditOutcome::Unchanged),
        }
    }

    /// Apply the draft to the matrix and enter `Saving`.
    ///
    /// Returns the record to persist, or `None` when there was no draft and
    /// the edit simply closed.
    pub fn begin_commit(&mut self) -> Result<Option<InteractionEffectRecord>, EditError> {
        let CellEditState::Editing {
            row,
            col,
            original,
            draft,
        } = &self.state
        else {
            return Err(EditError::NotEditing);
        };
        let Some(value) = *draft else {
            self.state = CellEditState::Idle;
            return Ok(None);
        };
        let (row, col, original) = (row.clone(), col.clone(), *original);

        self.matrix.set(&row, &col, value)?;
        self.tracker.begin()?;
        let record = InteractionEffectRecord {
            organization_id: self.organization_id.clone(),
            control_a: row.clone(),
            control_b: col.clone(),
            interaction_effect: Some(value),
        };
        self.state = CellEditState::Saving {
            row,
            col,
            original,
            value,
        };
        Ok(Some(record))
    }

    /// Settle a save started with `begin_commit`. Without one in flight the
    /// editor is left as it was.
    pub fn finish_commit(
        &mut self,
        result: Result<(), RepositoryError>,
    ) -> Result<EditOutcome, EditError> {
        let CellEditState::Saving {
            row,
            col,
            original,
            value,
        } = &self.state
        else {
            return Err(EditError::NotSaving);
        };
        let (row, col, original, value) = (row.clone(), col.clone(), *original, *value);
        self.state = CellEditState::Idle;

        match result {
            Ok(()) => {
                self.tracker.commit()?;
                tracing::info!(a = %row, b = %col, value, "interaction effect saved");
                Ok(EditOutcome::Saved {
                    previous: original,
                    value,
                })
            }
            Err(e) => {
                self.tracker.fail(e.to_string())?;
                tracing::warn!(a = %row, b = %col, error = %e, "interaction save failed, reverting");
                self.matrix.restore(&row, &col, original)?;
                Err(EditError::SaveFailed(e))
            }
        }
    }

    /// Offer freshly fetched records. Ignored while a cell save is in flight.
    ///
    /// An open edit keeps its draft; its original is refreshed so a failed
    /// save falls back to the reloaded value.
    pub fn apply_reload(&mut self, records: &[InteractionEffectRecord]) -> bool {
        if !self.tracker.can_accept_reload() {
            tracing::debug!(org = %self.organization_id, "interaction reload ignored while saving");
            return false;
        }
        let matrix = InteractionMatrix::from_records(self.matrix.controls().to_vec(), records);
        if let CellEditState::Editing {
            row, col, original, ..
        } = &mut self.state
        {
            *original = matrix.get(row, col);
        }
        self.matrix = matrix;
        true
    }
}

impl From<SaveError> for EditError {
    fn from(e: SaveError) -> Self {
        match e {
            SaveError::AlreadySaving => EditError::Busy,
            SaveError::NotSaving => EditError::NotSaving,
        }
    }
}
