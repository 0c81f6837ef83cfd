//! Signing key history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::rfc3339;

/// Lifecycle status of a signing key.
///
/// Unrecognized statuses keep their original string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyStatus {
    /// In service.
    Active,
    /// Compromised or withdrawn; never valid.
    Revoked,
    /// Rotated out; validity is governed by its window.
    Retired,
    /// Any other status string.
    Other(String),
}

impl KeyStatus {
    /// Wire form.
    pub fn as_str(&self) -> &str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Revoked => "revoked",
            KeyStatus::Retired => "retired",
            KeyStatus::Other(s) => s,
        }
    }
}

impl From<String> for KeyStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => KeyStatus::Active,
            "revoked" => KeyStatus::Revoked,
            "retired" => KeyStatus::Retired,
            _ => KeyStatus::Other(s),
        }
    }
}

impl From<KeyStatus> for String {
    fn from(status: KeyStatus) -> Self {
        match status {
            KeyStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// One key identifier and its validity epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key identifier.
    pub kid: String,
    /// Lifecycle status.
    pub status: KeyStatus,
    /// Start of validity.
    #[serde(with = "rfc3339")]
    pub not_before: DateTime<Utc>,
    /// End of validity; `None` is open-ended.
    #[serde(
        default,
        with = "rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_after: Option<DateTime<Utc>>,
}

/// Key history document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHistory {
    /// Records in document order.
    #[serde(default)]
    pub keys: Vec<KeyRecord>,
}

impl KeyHistory {
    /// First record whose `kid` matches, in document order.
    pub fn find(&self, kid: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Parse a key history document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
