//! Derived values shared between views: TEF, TotalLEF, TotalRisk and the
//! selected threat actor.
//!
//! Values live in a key-value store injected by the caller. Each value has a
//! single producer that overwrites it on recomputation; readers get a default
//! when nothing was stored yet.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rq_common::ThreatActorId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KEY_TEF: &str = "tef";
pub const KEY_TOTAL_LEF: &str = "totalLEF";
pub const KEY_TOTAL_RISK: &str = "totalRisk";
pub const KEY_SELECTED_THREAT_ACTOR: &str = "selectedThreatActorId";

/// A stored entry: numbers for scores, text for ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Number(f64),
    Text(String),
}

impl StoredValue {
    /// Numeric view. Text that parses as a number is accepted.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            StoredValue::Number(n) if n.is_finite() => Some(*n),
            StoredValue::Number(_) => None,
            StoredValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            StoredValue::Text(s) => Some(s.clone()),
            StoredValue::Number(n) => Some(n.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store {path} is corrupted: {message}")]
    Corrupted { path: PathBuf, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for rq_common::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(io) => rq_common::Error::Io(io),
            StoreError::Json(json) => rq_common::Error::Json(json),
            corrupted @ StoreError::Corrupted { .. } => {
                rq_common::Error::StoreCorrupted(corrupted.to_string())
            }
        }
    }
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError>;
    fn set(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    /// Drop every entry, even when the current content is unreadable.
    fn clear(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        Ok(())
    }
}

/// On-disk layout of a `FileStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    values: BTreeMap<String, StoredValue>,
}

/// JSON file store. Every write replaces the file atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreFile, StoreError> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(StoreFile::default());
        }
        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupted {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write(&self, mut file: StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        file.updated_at = Some(Utc::now());
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&file)?;
        {
            let mut out = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            out.write_all(&json)?;
            out.flush()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.read()?.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        let mut file = self.read()?;
        file.values.insert(key.to_string(), value);
        self.write(file)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut file = self.read()?;
        if file.values.remove(key).is_some() {
            self.write(file)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.write(StoreFile::default())
    }
}

/// Current derived values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSnapshot {
    pub tef: f64,
    #[serde(rename = "totalLEF")]
    pub total_lef: f64,
    pub total_risk: f64,
    pub selected_threat_actor_id: Option<ThreatActorId>,
}

/// Typed access to the derived values in a store.
#[derive(Debug, Clone)]
pub struct DerivedState<S> {
    store: S,
}

impl<S: KeyValueStore> DerivedState<S> {
    pub fn new(store: S) -> Self {
        DerivedState { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn tef(&self) -> Result<f64, StoreError> {
        self.number(KEY_TEF)
    }

    pub fn set_tef(&mut self, tef: f64) -> Result<(), StoreError> {
        self.set_number(KEY_TEF, tef)
    }

    pub fn total_lef(&self) -> Result<f64, StoreError> {
        self.number(KEY_TOTAL_LEF)
    }

    pub fn set_total_lef(&mut self, total_lef: f64) -> Result<(), StoreError> {
        self.set_number(KEY_TOTAL_LEF, total_lef)
    }

    pub fn total_risk(&self) -> Result<f64, StoreError> {
        self.number(KEY_TOTAL_RISK)
    }

    pub fn set_total_risk(&mut self, total_risk: f64) -> Result<(), StoreError> {
        self.set_number(KEY_TOTAL_RISK, total_risk)
    }

    pub fn selected_threat_actor(&self) -> Result<Option<ThreatActorId>, StoreError> {
        Ok(self
            .store
            .get(KEY_SELECTED_THREAT_ACTOR)?
            .and_then(|v| v.as_text())
            .filter(|s| !s.is_empty())
            .map(ThreatActorId::from))
    }

    pub fn select_threat_actor(&mut self, id: Option<&ThreatActorId>) -> Result<(), StoreError> {
        match id {
            Some(id) => self
                .store
                .set(KEY_SELECTED_THREAT_ACTOR, StoredValue::Text(id.to_string())),
            None => self.store.remove(KEY_SELECTED_THREAT_ACTOR),
        }
    }

    pub fn snapshot(&self) -> Result<DerivedSnapshot, StoreError> {
        Ok(DerivedSnapshot {
            tef: self.tef()?,
            total_lef: self.total_lef()?,
            total_risk: self.total_risk()?,
            selected_threat_actor_id: self.selected_threat_actor()?,
        })
    }

    /// Overwrite every derived value.
    pub fn record(&mut self, snapshot: &DerivedSnapshot) -> Result<(), StoreError> {
        self.set_tef(snapshot.tef)?;
        self.set_total_lef(snapshot.total_lef)?;
        self.set_total_risk(snapshot.total_risk)?;
        self.select_threat_actor(snapshot.selected_threat_actor_id.as_ref())
    }

    /// Back to defaults.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.store.clear()
    }

    fn number(&self, key: &str) -> Result<f64, StoreError> {
        Ok(self
            .store
            .get(key)?
            .and_then(|v| v.as_number())
            .unwrap_or(0.0))
    }

    fn set_number(&mut self, key: &str, value: f64) -> Result<(), StoreError> {
        self.store
            .set(key, StoredValue::Number(rq_math::finite_or_zero(value)))
    }
}
