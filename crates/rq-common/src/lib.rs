//! Risk Quant common types, IDs, and errors.
//!
//! This crate provides foundational types shared across rq-core modules:
//! - Identifier newtypes for users, organizations, threat actors, assets and controls
//! - Qualitative level enums and their numeric lookup tables
//! - Records exchanged with the persistence service
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod levels;
pub mod model;
pub mod output;

pub use error::{Error, ErrorCategory, Result};
pub use id::{
    AssetId, ControlName, FactorId, LossTypeId, OrganizationId, PreferenceKey, PreferenceSubject,
    SessionId, ThreatActorId, UserId, VulnerabilityId,
};
pub use levels::{RelevanceLevel, ResourceLevel, SophisticationLevel};
pub use output::OutputFormat;

/// Schema version for scenario and report documents.
pub const SCHEMA_VERSION: &str = "1.0.0";
