//! Secondary loss ledger: loss types and per-asset amounts.

use std::collections::BTreeMap;

use rq_common::model::{LossAmount, LossType};
use rq_common::{AssetId, LossTypeId, OrganizationId};
use rq_config::DefaultLossType;
use thiserror::Error;

use crate::repository::LossRepository;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("loss type label must not be empty")]
    EmptyLabel,
    #[error("loss type {0:?} already exists")]
    DuplicateLabel(String),
    #[error("loss type id {0} already exists")]
    DuplicateId(String),
    #[error("unknown loss type {0}")]
    UnknownLossType(String),
    #[error("loss amount must be a finite number, got {0}")]
    NonFinite(f64),
}

impl From<LedgerError> for rq_common::Error {
    fn from(e: LedgerError) -> Self {
        rq_common::Error::InvalidInput(e.to_string())
    }
}

/// Loss types of one organization and the amounts recorded against them.
///
/// Stored types whose label repeats a known one are kept as aliases of it;
/// amounts recorded against an alias land on the aliased type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossLedger {
    types: Vec<LossType>,
    aliases: BTreeMap<LossTypeId, LossTypeId>,
    amounts: BTreeMap<(AssetId, LossTypeId), f64>,
}

impl LossLedger {
    /// Ledger seeded with the built-in loss types.
    pub fn from_defaults(defaults: &[DefaultLossType]) -> Self {
        LossLedger {
            types: defaults
                .iter()
                .map(|d| LossType {
                    id: d.id.as_str().into(),
                    label: d.label.clone(),
                    is_custom: false,
                    description: None,
                })
                .collect(),
            aliases: BTreeMap::new(),
            amounts: BTreeMap::new(),
        }
    }

    /// Seed from defaults, then pull custom types and amounts from the
    /// repository.
    pub fn load<R>(
        repo: &R,
        organization: &OrganizationId,
        defaults: &[DefaultLossType],
    ) -> rq_common::Result<Self>
    where
        R: LossRepository + ?Sized,
    {
        let mut ledger = Self::from_defaults(defaults);
        for loss_type in repo.loss_types(organization)? {
            ledger.merge_stored(loss_type);
        }
        for amount in repo.amounts(organization)? {
            ledger.set_amount(&amount.asset_id, &amount.loss_type_id, amount.amount)?;
        }
        Ok(ledger)
    }

    pub fn types(&self) -> &[LossType] {
        &self.types
    }

    pub fn custom_types(&self) -> impl Iterator<Item = &LossType> {
        self.types.iter().filter(|t| t.is_custom)
    }

    pub fn contains(&self, id: &LossTypeId) -> bool {
        self.types.iter().any(|t| &t.id == id)
    }

    /// The type an id stands for: itself, or the type it aliases.
    pub fn resolve<'a>(&'a self, id: &'a LossTypeId) -> Option<&'a LossTypeId> {
        if self.contains(id) {
            return Some(id);
        }
        self.aliases.get(id)
    }

    /// Take in a type read back from the persistence service.
    ///
    /// Unlike `insert_type` this never fails: a known id is skipped, a known
    /// label becomes an alias of the existing type and a blank label is
    /// dropped.
    pub fn merge_stored(&mut self, loss_type: LossType) {
        let label = loss_type.label.trim();
        if label.is_empty() {
            tracing::warn!(id = %loss_type.id, "skipping stored loss type without a label");
            return;
        }
        if self.resolve(&loss_type.id).is_some() {
            return;
        }
        match self.find_label(label).map(|t| t.id.clone()) {
            Some(target) => {
                tracing::warn!(
                    id = %loss_type.id,
                    existing = %target,
                    label,
                    "stored loss type duplicates a known label, treating as the same type"
                );
                self.aliases.insert(loss_type.id, target);
            }
            None => self.types.push(loss_type),
        }
    }

    /// Add an already identified loss type.
    ///
    /// Labels are compared case-insensitively.
    pub fn insert_type(&mut self, loss_type: LossType) -> Result<(), LedgerError> {
        let label = loss_type.label.trim();
        if label.is_empty() {
            return Err(LedgerError::EmptyLabel);
        }
        if self.contains(&loss_type.id) {
            return Err(LedgerError::DuplicateId(loss_type.id.to_string()));
        }
        if self.find_label(label).is_some() {
            return Err(LedgerError::DuplicateLabel(label.to_string()));
        }
        self.types.push(loss_type);
        Ok(())
    }

    /// Create a custom loss type with a fresh id.
    pub fn add_custom(
        &mut self,
        label: &str,
        description: Option<String>,
    ) -> Result<LossType, LedgerError> {
        let loss_type = LossType {
            id: format!("custom-{}", uuid::Uuid::new_v4().simple()).into(),
            label: label.trim().to_string(),
            is_custom: true,
            description,
        };
        self.insert_type(loss_type.clone())?;
        Ok(loss_type)
    }

    /// Create a custom loss type and persist it.
    pub fn create_custom<R>(
        &mut self,
        repo: &mut R,
        organization: &OrganizationId,
        label: &str,
        description: Option<String>,
    ) -> rq_common::Result<LossType>
    where
        R: LossRepository + ?Sized,
    {
        let loss_type = self.add_custom(label, description)?;
        if let Err(e) = repo.create_loss_type(organization, &loss_type) {
            self.types.retain(|t| t.id != loss_type.id);
            return Err(e.into());
        }
        Ok(loss_type)
    }

    pub fn set_amount(
        &mut self,
        asset: &AssetId,
        loss_type: &LossTypeId,
        amount: f64,
    ) -> Result<(), LedgerError> {
        if !amount.is_finite() {
            return Err(LedgerError::NonFinite(amount));
        }
        let Some(id) = self.resolve(loss_type).cloned() else {
            return Err(LedgerError::UnknownLossType(loss_type.to_string()));
        };
        self.amounts.insert((asset.clone(), id), amount);
        Ok(())
    }

    /// Set an amount and persist it, restoring the previous amount when the
    /// write fails.
    pub fn save_amount<R>(
        &mut self,
        repo: &mut R,
        organization: &OrganizationId,
        asset: &AssetId,
        loss_type: &LossTypeId,
        amount: f64,
    ) -> rq_common::Result<()>
    where
        R: LossRepository + ?Sized,
    {
        let Some(id) = self.resolve(loss_type).cloned() else {
            return Err(LedgerError::UnknownLossType(loss_type.to_string()).into());
        };
        let key = (asset.clone(), id);
        let previous = self.amounts.get(&key).copied();
        self.set_amount(asset, loss_type, amount)?;
        let record = LossAmount {
            asset_id: asset.clone(),
            loss_type_id: loss_type.clone(),
            amount,
        };
        if let Err(e) = repo.save_amount(organization, &record) {
            match previous {
                Some(p) => self.amounts.insert(key, p),
                None => self.amounts.remove(&key),
            };
            return Err(e.into());
        }
        Ok(())
    }

    pub fn clear_amount(&mut self, asset: &AssetId, loss_type: &LossTypeId) {
        if let Some(id) = self.resolve(loss_type).cloned() {
            self.amounts.remove(&(asset.clone(), id));
        }
    }

    /// Recorded amount, `0.0` when never set.
    pub fn amount(&self, asset: &AssetId, loss_type: &LossTypeId) -> f64 {
        self.resolve(loss_type)
            .and_then(|id| self.amounts.get(&(asset.clone(), id.clone())))
            .copied()
            .unwrap_or(0.0)
    }

    /// Σ of the asset's amounts over every loss type, default and custom.
    pub fn secondary_loss_magnitude(&self, asset: &AssetId) -> f64 {
        self.types.iter().map(|t| self.amount(asset, &t.id)).sum()
    }

    pub fn amounts(&self) -> Vec<LossAmount> {
        self.amounts
            .iter()
            .map(|((asset_id, loss_type_id), amount)| LossAmount {
                asset_id: asset_id.clone(),
                loss_type_id: loss_type_id.clone(),
                amount: *amount,
            })
            .collect()
    }

    fn find_label(&self, label: &str) -> Option<&LossType> {
        let wanted = label.to_lowercase();
        self.types
            .iter()
            .find(|t| t.label.trim().to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use rq_config::RiskQuantConfig;

    fn ledger() -> LossLedger {
        LossLedger::from_defaults(&RiskQuantConfig::default().loss_types)
    }

    #[test]
    fn seeded_with_six_defaults() {
        let l = ledger();
        assert_eq!(l.types().len(), 6);
        assert_eq!(l.custom_types().count(), 0);
    }

    #[test]
    fn slm_sums_default_and_custom() {
        let mut l = ledger();
        let asset: AssetId = "db".into();
        let custom = l.add_custom("Legal fees", None).unwrap();
        l.set_amount(&asset, &"response".into(), 1.5).unwrap();
        l.set_amount(&asset, &custom.id, 2.0).unwrap();
        l.set_amount(&"other".into(), &"response".into(), 9.0).unwrap();
        assert_eq!(l.secondary_loss_magnitude(&asset), 3.5);
        assert_eq!(l.amount(&asset, &"reputation".into()), 0.0);
    }

    #[test]
    fn duplicate_label_rejected_case_insensitively() {
        let mut l = ledger();
        assert_eq!(
            l.add_custom("  REPUTATION ", None),
            Err(LedgerError::DuplicateLabel("REPUTATION".into()))
        );
        assert_eq!(l.add_custom("   ", None), Err(LedgerError::EmptyLabel));
    }

    #[test]
    fn stored_duplicate_label_becomes_alias() {
        let mut l = ledger();
        l.merge_stored(LossType {
            id: "c1".into(),
            label: "reputation".into(),
            is_custom: true,
            description: None,
        });
        l.merge_stored(LossType {
            id: "c2".into(),
            label: " ".into(),
            is_custom: true,
            description: None,
        });
        assert_eq!(l.types().len(), 6);
        assert_eq!(l.resolve(&"c1".into()), Some(&LossTypeId::from("reputation")));

        let asset: AssetId = "db".into();
        l.set_amount(&asset, &"c1".into(), 5.0).unwrap();
        assert_eq!(l.amount(&asset, &"reputation".into()), 5.0);
        assert_eq!(l.secondary_loss_magnitude(&asset), 5.0);
        assert_eq!(l.amounts()[0].loss_type_id, LossTypeId::from("reputation"));

        assert!(matches!(
            l.set_amount(&asset, &"c2".into(), 1.0),
            Err(LedgerError::UnknownLossType(_))
        ));
    }

    #[test]
    fn unknown_type_rejected() {
        let mut l = ledger();
        assert!(matches!(
            l.set_amount(&"db".into(), &"nope".into(), 1.0),
            Err(LedgerError::UnknownLossType(_))
        ));
    }

    #[test]
    fn failed_amount_save_restores_previous() {
        let mut l = ledger();
        let mut repo = MemoryRepository::new();
        let org: OrganizationId = "org".into();
        let asset: AssetId = "db".into();
        l.save_amount(&mut repo, &org, &asset, &"fines".into(), 4.0)
            .unwrap();

        repo.set_offline(true);
        let err = l
            .save_amount(&mut repo, &org, &asset, &"fines".into(), 7.0)
            .unwrap_err();
        assert_eq!(err.code(), 40);
        assert_eq!(l.amount(&asset, &"fines".into()), 4.0);
    }

    #[test]
    fn load_merges_repository_state() {
        let mut repo = MemoryRepository::new();
        let org: OrganizationId = "org".into();
        let mut l = ledger();
        let custom = l
            .create_custom(&mut repo, &org, "Legal", Some("outside counsel".into()))
            .unwrap();
        l.save_amount(&mut repo, &org, &"db".into(), &custom.id, 3.0)
            .unwrap();

        let loaded =
            LossLedger::load(&repo, &org, &RiskQuantConfig::default().loss_types).unwrap();
        assert_eq!(loaded.types().len(), 7);
        assert_eq!(loaded.secondary_loss_magnitude(&"db".into()), 3.0);
    }
}
