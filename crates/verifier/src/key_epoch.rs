//! Key epoch validation: is a signing key identifier usable at a given instant?

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tfws_core::{
    format_timestamp, KeyHistory, KeyStatus, Signal, SIGNAL_KEY_EPOCH_VALID,
    WEIGHT_KEY_EPOCH_VALID,
};

use crate::error::{Result, VerifierError};

/// Outcome reason of a key epoch check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEpochReason {
    /// Key is usable.
    Ok,
    /// No record carries the kid.
    KidNotFound,
    /// Record is revoked.
    KidRevoked,
    /// Instant precedes `not_before`.
    BeforeNotBefore,
    /// Instant follows `not_after`.
    AfterNotAfter,
}

impl KeyEpochReason {
    /// Canonical snake_case string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyEpochReason::Ok => "ok",
            KeyEpochReason::KidNotFound => "kid_not_found",
            KeyEpochReason::KidRevoked => "kid_revoked",
            KeyEpochReason::BeforeNotBefore => "before_not_before",
            KeyEpochReason::AfterNotAfter => "after_not_after",
        }
    }
}

impl fmt::Display for KeyEpochReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`check_key_epoch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEpochCheck {
    /// True only for [`KeyEpochReason::Ok`].
    pub ok: bool,
    /// Why.
    pub reason: KeyEpochReason,
    /// Key identifier that was checked.
    pub kid: String,
}

impl KeyEpochCheck {
    fn new(kid: &str, reason: KeyEpochReason) -> Self {
        Self {
            ok: reason == KeyEpochReason::Ok,
            reason,
            kid: kid.to_string(),
        }
    }

    /// `key_epoch_valid` signal: pass when ok, fail otherwise.
    pub fn to_signal(&self) -> Signal {
        let evidence = vec![format!("kid={}", self.kid), format!("reason={}", self.reason)];
        if self.ok {
            Signal::pass(SIGNAL_KEY_EPOCH_VALID, WEIGHT_KEY_EPOCH_VALID, evidence)
        } else {
            Signal::fail(SIGNAL_KEY_EPOCH_VALID, WEIGHT_KEY_EPOCH_VALID, evidence)
        }
    }
}

/// Validate `kid` against its history at instant `at`.
///
/// The first record in document order with a matching kid is authoritative.
/// Revocation is checked before the validity window, so a revoked key never
/// validates. Both window bounds are inclusive.
pub fn check_key_epoch(history: &KeyHistory, kid: &str, at: DateTime<Utc>) -> KeyEpochCheck {
    let Some(record) = history.find(kid) else {
        return KeyEpochCheck::new(kid, KeyEpochReason::KidNotFound);
    };

    let reason = if record.status == KeyStatus::Revoked {
        KeyEpochReason::KidRevoked
    } else if at < record.not_before {
        KeyEpochReason::BeforeNotBefore
    } else if record.not_after.is_some_and(|not_after| at > not_after) {
        KeyEpochReason::AfterNotAfter
    } else {
        KeyEpochReason::Ok
    };

    tracing::debug!(
        kid,
        at = %format_timestamp(&at),
        reason = reason.as_str(),
        "key epoch checked"
    );
    KeyEpochCheck::new(kid, reason)
}

/// Read and parse a key history document.
pub fn load_key_history(path: &Path) -> Result<KeyHistory> {
    let bytes = std::fs::read(path).map_err(|e| VerifierError::io(path, e))?;
    KeyHistory::from_json_slice(&bytes).map_err(|e| VerifierError::parse(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfws_core::parse_timestamp;

    fn history() -> KeyHistory {
        KeyHistory::from_json_slice(
            br#"{"keys":[
                {"kid":"k-2025","status":"active","not_before":"2025-01-01T00:00:00Z","not_after":"2025-12-31T23:59:59Z"},
                {"kid":"k-2026","status":"active","not_before":"2026-01-01T00:00:00Z"},
                {"kid":"k-leaked","status":"revoked","not_before":"2025-01-01T00:00:00Z","not_after":"2030-01-01T00:00:00Z"},
                {"kid":"k-dup","status":"revoked","not_before":"2025-01-01T00:00:00Z"},
                {"kid":"k-dup","status":"active","not_before":"2025-01-01T00:00:00Z"},
                {"kid":"k-old","status":"retired","not_before":"2020-01-01T00:00:00Z","not_after":"2021-01-01T00:00:00Z"}
            ]}"#,
        )
        .unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn inside_window_is_ok() {
        let check = check_key_epoch(&history(), "k-2025", at("2025-06-01T00:00:00Z"));
        assert!(check.ok);
        assert_eq!(check.reason, KeyEpochReason::Ok);
        assert_eq!(check.kid, "k-2025");
    }

    #[test]
    fn unknown_kid() {
        let check = check_key_epoch(&history(), "nope", at("2025-06-01T00:00:00Z"));
        assert!(!check.ok);
        assert_eq!(check.reason, KeyEpochReason::KidNotFound);
    }

    #[test]
    fn revocation_wins_inside_window() {
        let check = check_key_epoch(&history(), "k-leaked", at("2026-06-01T00:00:00Z"));
        assert_eq!(check.reason, KeyEpochReason::KidRevoked);
    }

    #[test]
    fn window_bounds() {
        let h = history();
        assert_eq!(
            check_key_epoch(&h, "k-2026", at("2025-12-31T23:59:59Z")).reason,
            KeyEpochReason::BeforeNotBefore
        );
        assert_eq!(
            check_key_epoch(&h, "k-2026", at("2026-01-01T00:00:00Z")).reason,
            KeyEpochReason::Ok
        );
        assert_eq!(
            check_key_epoch(&h, "k-2025", at("2025-12-31T23:59:59Z")).reason,
            KeyEpochReason::Ok
        );
        assert_eq!(
            check_key_epoch(&h, "k-2025", at("2026-01-01T00:00:00Z")).reason,
            KeyEpochReason::AfterNotAfter
        );
    }

    #[test]
    fn open_ended_key_stays_valid() {
        let check = check_key_epoch(&history(), "k-2026", at("2099-01-01T00:00:00Z"));
        assert!(check.ok);
    }

    #[test]
    fn first_duplicate_in_document_order_wins() {
        let check = check_key_epoch(&history(), "k-dup", at("2026-01-01T00:00:00Z"));
        assert_eq!(check.reason, KeyEpochReason::KidRevoked);
    }

    #[test]
    fn retired_is_governed_by_window_only() {
        let h = history();
        assert!(check_key_epoch(&h, "k-old", at("2020-06-01T00:00:00Z")).ok);
        assert_eq!(
            check_key_epoch(&h, "k-old", at("2022-01-01T00:00:00Z")).reason,
            KeyEpochReason::AfterNotAfter
        );
    }

    #[test]
    fn folds_into_signal() {
        let check = check_key_epoch(&history(), "k-leaked", at("2026-01-01T00:00:00Z"));
        let signal = check.to_signal();
        assert_eq!(signal.code, "key_epoch_valid");
        assert_eq!(signal.token(), "key_epoch_valid:fail");
        assert_eq!(signal.evidence, vec!["kid=k-leaked", "reason=kid_revoked"]);
    }

    #[test]
    fn serializes_reason_snake_case() {
        let check = check_key_epoch(&history(), "k-2026", at("2025-01-01T00:00:00Z"));
        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value["reason"], "before_not_before");
        assert_eq!(value["ok"], false);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_key_history(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, VerifierError::Io { .. }));
    }
}
