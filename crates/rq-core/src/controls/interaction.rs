//! Symmetric pairwise interaction effects between controls.
//!
//! Each unordered pair is stored once under its alphabetically ordered key.
//! The diagonal is never stored and always reads as `None`, which is not the
//! same as a confirmed `0.0`.

use std::collections::{BTreeMap, BTreeSet};

use rq_common::model::InteractionEffectRecord;
use rq_common::{ControlName, OrganizationId};
use serde::Serialize;
use thiserror::Error;

use crate::repository::canonical_pair;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("control {0} cannot interact with itself")]
    Diagonal(ControlName),
    #[error("interaction effect must be within [0, 1], got {0}")]
    OutOfRange(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionMatrix {
    controls: Vec<ControlName>,
    cells: BTreeMap<(ControlName, ControlName), f64>,
}

/// One row of the matrix as displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRow {
    pub control: ControlName,
    pub effects: Vec<Option<f64>>,
}

impl InteractionMatrix {
    pub fn new<I>(controls: I) -> Self
    where
        I: IntoIterator<Item = ControlName>,
    {
        let mut matrix = InteractionMatrix::default();
        for control in controls {
            matrix.add_control(control);
        }
        matrix
    }

    /// Build from stored records. Diagonal, out-of-range and empty records are
    /// skipped.
    pub fn from_records<I>(controls: I, records: &[InteractionEffectRecord]) -> Self
    where
        I: IntoIterator<Item = ControlName>,
    {
        let mut matrix = Self::new(controls);
        for record in records {
            let Some(value) = record.interaction_effect else {
                continue;
            };
            if let Err(e) = matrix.set(&record.control_a, &record.control_b, value) {
                tracing::warn!(
                    a = %record.control_a,
                    b = %record.control_b,
                    error = %e,
                    "skipping stored interaction effect"
                );
            }
        }
        matrix
    }

    pub fn add_control(&mut self, control: ControlName) {
        if !self.controls.contains(&control) {
            self.controls.push(control);
        }
    }

    pub fn controls(&self) -> &[ControlName] {
        &self.controls
    }

    /// Effect of the pair in either order.
    pub fn get(&self, a: &ControlName, b: &ControlName) -> Option<f64> {
        if a == b {
            return None;
        }
        self.cells.get(&canonical_pair(a, b)).copied()
    }

    /// Store an effect for the pair and return the previous one.
    pub fn set(
        &mut self,
        a: &ControlName,
        b: &ControlName,
        value: f64,
    ) -> Result<Option<f64>, MatrixError> {
        if a == b {
            return Err(MatrixError::Diagonal(a.clone()));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(MatrixError::OutOfRange(value));
        }
        self.add_control(a.clone());
        self.add_control(b.clone());
        Ok(self.cells.insert(canonical_pair(a, b), value))
    }

    /// Forget the pair's effect.
    pub fn clear(&mut self, a: &ControlName, b: &ControlName) -> Option<f64> {
        self.cells.remove(&canonical_pair(a, b))
    }

    /// Put back a value read earlier with `get`.
    pub fn restore(
        &mut self,
        a: &ControlName,
        b: &ControlName,
        value: Option<f64>,
    ) -> Result<(), MatrixError> {
        match value {
            Some(v) => self.set(a, b, v).map(|_| ()),
            None => {
                if a == b {
                    return Err(MatrixError::Diagonal(a.clone()));
                }
                self.clear(a, b);
                Ok(())
            }
        }
    }

    /// Σ effect over unordered pairs of the selection. Missing effects count
    /// as zero and repeated names are counted once.
    pub fn synergy(&self, selected: &[ControlName]) -> f64 {
        let unique: Vec<&ControlName> = selected.iter().collect::<BTreeSet<_>>().into_iter().collect();
        let mut sum = 0.0;
        for (i, a) in unique.iter().enumerate() {
            for b in &unique[i + 1..] {
                sum += self.get(a, b).unwrap_or(0.0);
            }
        }
        sum
    }

    pub fn rows(&self) -> Vec<MatrixRow> {
        self.controls
            .iter()
            .map(|row| MatrixRow {
                control: row.clone(),
                effects: self.controls.iter().map(|col| self.get(row, col)).collect(),
            })
            .collect()
    }

    /// One record per stored pair, in canonical order.
    pub fn to_records(&self, organization: &OrganizationId) -> Vec<InteractionEffectRecord> {
        self.cells
            .iter()
            .map(|((a, b), v)| InteractionEffectRecord {
                organization_id: organization.clone(),
                control_a: a.clone(),
                control_b: b.clone(),
                interaction_effect: Some(*v),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
