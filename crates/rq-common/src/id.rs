//! Identity types for scoring entities.
//!
//! Every entity the persistence service hands us is addressed by an opaque
//! string id. Controls are the exception: they are keyed by name.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(
    /// Authenticated user.
    UserId
);
string_id!(
    /// Organization that owns assets, controls and a budget.
    OrganizationId
);
string_id!(
    /// Threat actor record from the threat catalogue.
    ThreatActorId
);
string_id!(
    /// Motivation or goal of a threat actor.
    FactorId
);
string_id!(
    /// Organizational asset.
    AssetId
);
string_id!(
    /// Vulnerability attached to an asset.
    VulnerabilityId
);
string_id!(
    /// Default or custom secondary loss type.
    LossTypeId
);
string_id!(
    /// Security control. Controls have no separate id, the name is the key.
    ControlName
);

/// What a stored preference record is about.
///
/// Asset-loss preferences are organisation-wide and reuse the preference
/// table under a surrogate subject instead of a threat actor id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PreferenceSubject {
    ThreatActor(ThreatActorId),
    OrganizationAssets(OrganizationId),
}

impl PreferenceSubject {
    /// Flat key used by key-value backends.
    pub fn storage_key(&self) -> String {
        match self {
            PreferenceSubject::ThreatActor(id) => format!("threat-actor:{id}"),
            PreferenceSubject::OrganizationAssets(id) => format!("org-assets:{id}"),
        }
    }
}

impl fmt::Display for PreferenceSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// One preference record per (user, subject) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceKey {
    pub user_id: UserId,
    pub subject: PreferenceSubject,
}

impl PreferenceKey {
    pub fn threat_actor(user_id: UserId, actor: ThreatActorId) -> Self {
        PreferenceKey {
            user_id,
            subject: PreferenceSubject::ThreatActor(actor),
        }
    }

    pub fn organization_assets(user_id: UserId, org: OrganizationId) -> Self {
        PreferenceKey {
            user_id,
            subject: PreferenceSubject::OrganizationAssets(org),
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.subject)
    }
}

/// Session ID for the derived-state store.
///
/// Format: `rq-YYYYMMDD-HHMMSS-XXXX`
/// Example: `rq-20260115-143022-a7xq`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new session ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = generate_base32_suffix();
        SessionId(format!(
            "rq-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn generate_base32_suffix() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let mut value = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
    value &= 0x000F_FFFF;
    let alphabet = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut out = String::with_capacity(4);
    for shift in [15_u32, 10, 5, 0] {
        let idx = ((value >> shift) & 0x1F) as usize;
        out.push(alphabet[idx] as char);
    }
    out
}
