//! Persistence collaborators.
//!
//! The persistence service itself is external. These traits describe what the
//! engine needs from it; `MemoryRepository` backs tests and the CLI.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rq_common::model::{InteractionEffectRecord, LossAmount, LossType, UserPreference};
use rq_common::{AssetId, ControlName, LossTypeId, OrganizationId, PreferenceKey};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("persistence service unavailable: {0}")]
    Unavailable(String),
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for rq_common::Error {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Unavailable(msg) => rq_common::Error::SaveFailed(msg),
            RepositoryError::Conflict(msg) => rq_common::Error::Conflict(msg),
            RepositoryError::NotFound(msg) => rq_common::Error::NotFound(msg),
        }
    }
}

/// User preference records, one per (user, subject).
pub trait PreferenceRepository {
    fn get(&self, key: &PreferenceKey) -> Result<Option<UserPreference>, RepositoryError>;

    /// Create the record on first save, replace it afterwards. Returns the
    /// stored record with timestamps filled in.
    fn save(&mut self, preference: &UserPreference) -> Result<UserPreference, RepositoryError>;
}

/// Pairwise control interaction records.
pub trait InteractionRepository {
    fn list(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<InteractionEffectRecord>, RepositoryError>;

    /// Fails with `Conflict` when the pair already exists in either order.
    fn create(&mut self, record: &InteractionEffectRecord) -> Result<(), RepositoryError>;

    /// Looks the pair up in either order.
    fn find(
        &self,
        organization: &OrganizationId,
        a: &ControlName,
        b: &ControlName,
    ) -> Result<Option<InteractionEffectRecord>, RepositoryError>;

    fn update(&mut self, record: &InteractionEffectRecord) -> Result<(), RepositoryError>;
}

/// Custom loss types and per-asset loss amounts of an organization.
pub trait LossRepository {
    fn loss_types(&self, organization: &OrganizationId) -> Result<Vec<LossType>, RepositoryError>;

    fn create_loss_type(
        &mut self,
        organization: &OrganizationId,
        loss_type: &LossType,
    ) -> Result<(), RepositoryError>;

    fn amounts(&self, organization: &OrganizationId) -> Result<Vec<LossAmount>, RepositoryError>;

    fn save_amount(
        &mut self,
        organization: &OrganizationId,
        amount: &LossAmount,
    ) -> Result<(), RepositoryError>;
}

/// Order a control pair alphabetically.
pub fn canonical_pair(a: &ControlName, b: &ControlName) -> (ControlName, ControlName) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Write an interaction record under its canonical pair, turning a duplicate
/// create into an update of the existing record.
pub fn upsert_interaction<R>(
    repo: &mut R,
    record: &InteractionEffectRecord,
) -> Result<(), RepositoryError>
where
    R: InteractionRepository + ?Sized,
{
    let (control_a, control_b) = canonical_pair(&record.control_a, &record.control_b);
    let canonical = InteractionEffectRecord {
        organization_id: record.organization_id.clone(),
        control_a,
        control_b,
        interaction_effect: record.interaction_effect,
    };

    match repo.create(&canonical) {
        Ok(()) => Ok(()),
        Err(RepositoryError::Conflict(_)) => {
            let existing = repo
                .find(
                    &canonical.organization_id,
                    &canonical.control_a,
                    &canonical.control_b,
                )?
                .ok_or_else(|| {
                    RepositoryError::NotFound(format!(
                        "{} × {}",
                        canonical.control_a, canonical.control_b
                    ))
                })?;
            tracing::debug!(
                a = %existing.control_a,
                b = %existing.control_b,
                "interaction exists, updating"
            );
            repo.update(&InteractionEffectRecord {
                interaction_effect: canonical.interaction_effect,
                ..existing
            })
        }
        Err(e) => Err(e),
    }
}

type PairKey = (OrganizationId, ControlName, ControlName);

/// In-memory persistence with failure injection.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    preferences: HashMap<PreferenceKey, UserPreference>,
    interactions: BTreeMap<PairKey, InteractionEffectRecord>,
    loss_types: BTreeMap<OrganizationId, Vec<LossType>>,
    amounts: BTreeMap<(OrganizationId, AssetId, LossTypeId), LossAmount>,
    offline: bool,
    writes: usize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preference(mut self, preference: UserPreference) -> Self {
        self.preferences.insert(preference.key.clone(), preference);
        self
    }

    pub fn with_interaction(mut self, record: InteractionEffectRecord) -> Self {
        let key = pair_key(&record.organization_id, &record.control_a, &record.control_b);
        self.interactions.insert(key, record);
        self
    }

    /// While offline every write fails with `Unavailable`. Reads still work.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn check_online(&self) -> Result<(), RepositoryError> {
        if self.offline {
            return Err(RepositoryError::Unavailable("repository offline".to_string()));
        }
        Ok(())
    }
}

fn pair_key(org: &OrganizationId, a: &ControlName, b: &ControlName) -> PairKey {
    let (a, b) = canonical_pair(a, b);
    (org.clone(), a, b)
}

impl PreferenceRepository for MemoryRepository {
    fn get(&self, key: &PreferenceKey) -> Result<Option<UserPreference>, RepositoryError> {
        Ok(self.preferences.get(key).cloned())
    }

    fn save(&mut self, preference: &UserPreference) -> Result<UserPreference, RepositoryError> {
        self.check_online()?;
        let now = Utc::now();
        let mut stored = preference.clone();
        stored.created_at = self
            .preferences
            .get(&preference.key)
            .and_then(|p| p.created_at)
            .or(Some(now));
        stored.updated_at = Some(now);
        self.preferences.insert(stored.key.clone(), stored.clone());
        self.writes += 1;
        Ok(stored)
    }
}

impl InteractionRepository for MemoryRepository {
    fn list(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<InteractionEffectRecord>, RepositoryError> {
        Ok(self
            .interactions
            .iter()
            .filter(|((org, _, _), _)| org == organization)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn create(&mut self, record: &InteractionEffectRecord) -> Result<(), RepositoryError> {
        self.check_online()?;
        let key = pair_key(&record.organization_id, &record.control_a, &record.control_b);
        if self.interactions.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "{} × {}",
                record.control_a, record.control_b
            )));
        }
        self.interactions.insert(key, record.clone());
        self.writes += 1;
        Ok(())
    }

    fn find(
        &self,
        organization: &OrganizationId,
        a: &ControlName,
        b: &ControlName,
    ) -> Result<Option<InteractionEffectRecord>, RepositoryError> {
        Ok(self.interactions.get(&pair_key(organization, a, b)).cloned())
    }

    fn update(&mut self, record: &InteractionEffectRecord) -> Result<(), RepositoryError> {
        self.check_online()?;
        let key = pair_key(&record.organization_id, &record.control_a, &record.control_b);
        match self.interactions.get_mut(&key) {
            Some(existing) => {
                existing.interaction_effect = record.interaction_effect;
                self.writes += 1;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "{} × {}",
                record.control_a, record.control_b
            ))),
        }
    }
}

impl LossRepository for MemoryRepository {
    fn loss_types(&self, organization: &OrganizationId) -> Result<Vec<LossType>, RepositoryError> {
        Ok(self.loss_types.get(organization).cloned().unwrap_or_default())
    }

    fn create_loss_type(
        &mut self,
        organization: &OrganizationId,
        loss_type: &LossType,
    ) -> Result<(), RepositoryError> {
        self.check_online()?;
        let types = self.loss_types.entry(organization.clone()).or_default();
        if types.iter().any(|t| t.id == loss_type.id) {
            return Err(RepositoryError::Conflict(loss_type.id.to_string()));
        }
        types.push(loss_type.clone());
        self.writes += 1;
        Ok(())
    }

    fn amounts(&self, organization: &OrganizationId) -> Result<Vec<LossAmount>, RepositoryError> {
        Ok(self
            .amounts
            .iter()
            .filter(|((org, _, _), _)| org == organization)
            .map(|(_, a)| a.clone())
            .collect())
    }

    fn save_amount(
        &mut self,
        organization: &OrganizationId,
        amount: &LossAmount,
    ) -> Result<(), RepositoryError> {
        self.check_online()?;
        let key = (
            organization.clone(),
            amount.asset_id.clone(),
            amount.loss_type_id.clone(),
        );
        self.amounts.insert(key, amount.clone());
        self.writes += 1;
        Ok(())
    }
}
