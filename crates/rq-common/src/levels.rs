//! Qualitative levels and their numeric lookup tables.
//!
//! Sophistication and resource levels map linearly onto `(0, 1]` by rank.
//! Relevance levels use a fixed, unevenly spaced table. A missing or
//! unrecognised level scores `0.0`, it never fails a record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A level with a numeric score in `[0, 1]`.
pub trait Scored: Copy {
    fn score(self) -> f64;
}

/// Score of an optional level; absent levels contribute nothing.
pub fn score_or_zero<T: Scored>(level: Option<T>) -> f64 {
    level.map(Scored::score).unwrap_or(0.0)
}

/// Lowercase alphanumerics only, so "Very_High", "very high" and "VERY-HIGH"
/// all compare equal.
fn label_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Error for labels that are not part of a level table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {table} level: {label}")]
pub struct UnknownLevel {
    pub table: &'static str,
    pub label: String,
}

macro_rules! level_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $table:literal, [$($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All levels in ascending order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// 1-based position in the ordered table.
            pub fn rank(self) -> u32 {
                Self::ALL.iter().position(|l| *l == self).map(|p| p as u32 + 1).unwrap_or(0)
            }

            /// Display label.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLevel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = label_key(s);
                $(
                    if key == label_key($label) $(|| key == label_key($alias))* {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownLevel { table: $table, label: s.to_string() })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

level_enum!(
    /// Threat actor technical sophistication, 7 ranks.
    SophisticationLevel,
    "sophistication",
    [
        None => "None",
        Minimal => "Minimal",
        Intermediate => "Intermediate",
        Advanced => "Advanced",
        Expert => "Expert",
        Innovator => "Innovator",
        Strategic => "Strategic",
    ]
);

level_enum!(
    /// Threat actor resources, 6 ranks.
    ResourceLevel,
    "resource",
    [
        Individual => "Individual",
        Club => "Club",
        Contest => "Contest",
        Team => "Team",
        Organization => "Organization" | "Organisation",
        Government => "Government",
    ]
);

level_enum!(
    /// Relevance of a motivation, goal or vulnerability likelihood.
    RelevanceLevel,
    "relevance",
    [
        VeryLow => "Very Low",
        Low => "Low",
        Moderate => "Moderate" | "Medium",
        High => "High",
        VeryHigh => "Very High",
    ]
);

impl Scored for SophisticationLevel {
    /// `1 - (7 - rank) / 7`.
    fn score(self) -> f64 {
        let n = Self::ALL.len() as f64;
        1.0 - (n - self.rank() as f64) / n
    }
}

impl Scored for ResourceLevel {
    /// `1 - (6 - rank) / 6`.
    fn score(self) -> f64 {
        let n = Self::ALL.len() as f64;
        1.0 - (n - self.rank() as f64) / n
    }
}

impl Scored for RelevanceLevel {
    fn score(self) -> f64 {
        match self {
            RelevanceLevel::VeryLow => 0.1,
            RelevanceLevel::Low => 0.2,
            RelevanceLevel::Moderate => 0.5,
            RelevanceLevel::High => 0.8,
            RelevanceLevel::VeryHigh => 1.0,
        }
    }
}

/// Deserialize an optional level, mapping unknown labels and non-string
/// values to `None` instead of failing the whole record.
///
/// Use with `#[serde(default, deserialize_with = "levels::lenient")]`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
