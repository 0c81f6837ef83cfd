//! Trust-state assembly: baseline signals, folding check results, scoring.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tfws_core::{
    Signal, Subject, TrustState, DEFAULT_VALIDITY_DAYS, EVIDENCE_INVENTORY_SIGNATURE,
    EVIDENCE_KEY_HISTORY, EVIDENCE_TRUST_STATE_SCHEMA, SCHEMA_VERSION, SIGNAL_INVENTORY_SIGNED,
    SIGNAL_KEY_EPOCH_VALID, SIGNAL_SCHEMA_VALID, SIGNAL_WELL_KNOWN_PRESENT,
    WEIGHT_INVENTORY_SIGNED, WEIGHT_KEY_EPOCH_VALID, WEIGHT_SCHEMA_VALID,
    WEIGHT_WELL_KNOWN_PRESENT, WELL_KNOWN_PATH,
};

use crate::scoring::ScoringTable;

/// Placeholder signal set every evaluation starts from.
///
/// Only `schema_valid` is decided up front; the other entries stay `unknown`
/// until a check overwrites them via [`fold_signal`].
pub fn baseline_signals() -> Vec<Signal> {
    vec![
        Signal::pass(
            SIGNAL_SCHEMA_VALID,
            WEIGHT_SCHEMA_VALID,
            vec![EVIDENCE_TRUST_STATE_SCHEMA.to_string()],
        ),
        Signal::unknown(
            SIGNAL_WELL_KNOWN_PRESENT,
            WEIGHT_WELL_KNOWN_PRESENT,
            vec![WELL_KNOWN_PATH.to_string()],
        ),
        Signal::unknown(
            SIGNAL_INVENTORY_SIGNED,
            WEIGHT_INVENTORY_SIGNED,
            vec![EVIDENCE_INVENTORY_SIGNATURE.to_string()],
        ),
        Signal::unknown(
            SIGNAL_KEY_EPOCH_VALID,
            WEIGHT_KEY_EPOCH_VALID,
            vec![EVIDENCE_KEY_HISTORY.to_string()],
        ),
    ]
}

/// Replace the entry carrying `signal.code`, or append it.
pub fn fold_signal(signals: &mut Vec<Signal>, signal: Signal) {
    match signals.iter_mut().find(|s| s.code == signal.code) {
        Some(slot) => *slot = signal,
        None => signals.push(signal),
    }
}

/// Builds trust states with a fixed scoring table and validity window.
#[derive(Debug, Clone)]
pub struct Assessor {
    table: ScoringTable,
    validity: Duration,
}

impl Default for Assessor {
    fn default() -> Self {
        Self {
            table: ScoringTable::default(),
            validity: Duration::days(DEFAULT_VALIDITY_DAYS),
        }
    }
}

impl Assessor {
    /// Assessor with an explicit table and window.
    pub fn new(table: ScoringTable, validity: Duration) -> Self {
        Self { table, validity }
    }

    /// Build a trust state; `computed_at` is truncated to whole seconds.
    ///
    /// `valid_until` saturates at the latest representable instant.
    pub fn assess(
        &self,
        subject: Subject,
        signals: Vec<Signal>,
        computed_at: DateTime<Utc>,
    ) -> TrustState {
        let computed_at = computed_at.trunc_subsecs(0);
        TrustState {
            schema_version: SCHEMA_VERSION.to_string(),
            subject,
            computed_at,
            valid_until: computed_at
                .checked_add_signed(self.validity)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            score: self.table.score(&signals),
            signals,
        }
    }
}

/// Build a trust state with the default table and a 7-day window.
pub fn assess(subject: Subject, signals: Vec<Signal>, computed_at: DateTime<Utc>) -> TrustState {
    Assessor::default().assess(subject, signals, computed_at)
}
