//! Rollback / replay detection between two inventories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tfws_core::{InventoryDocument, Signal, SIGNAL_ROLLBACK_SUSPECTED, WEIGHT_ROLLBACK_SUSPECTED};

const SCORE_FEWER_FILES: u32 = 2;
const SCORE_MISSING_FILES: u32 = 2;
const SCORE_MANY_CHANGED: u32 = 1;

const SUSPECT_THRESHOLD: u32 = 3;
const POSSIBLE_THRESHOLD: u32 = 1;

const MIN_CHANGED_FLOOR: usize = 3;
const CHANGED_FRACTION_DIVISOR: usize = 20;

/// How the caller intends to react to a non-OK classification.
///
/// Carried through to the report; it never alters scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackMode {
    /// Any anomaly is fatal.
    #[default]
    HardFail,
    /// Only a suspected rollback is fatal; weaker anomalies are quarantined.
    Quarantine,
}

impl RollbackMode {
    /// Wire form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RollbackMode::HardFail => "hard-fail",
            RollbackMode::Quarantine => "quarantine",
        }
    }
}

impl fmt::Display for RollbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollbackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hard-fail" => Ok(RollbackMode::HardFail),
            "quarantine" => Ok(RollbackMode::Quarantine),
            other => Err(format!(
                "invalid rollback mode '{other}' (expected hard-fail or quarantine)"
            )),
        }
    }
}

/// Severity of a suspected rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackClassification {
    /// No anomaly.
    Ok,
    /// Weak evidence of rollback.
    RollbackPossible,
    /// Strong evidence of rollback.
    RollbackSuspect,
}

impl RollbackClassification {
    /// Wire form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RollbackClassification::Ok => "OK",
            RollbackClassification::RollbackPossible => "ROLLBACK_POSSIBLE",
            RollbackClassification::RollbackSuspect => "ROLLBACK_SUSPECT",
        }
    }

    fn from_score(score: u32) -> Self {
        if score >= SUSPECT_THRESHOLD {
            RollbackClassification::RollbackSuspect
        } else if score >= POSSIBLE_THRESHOLD {
            RollbackClassification::RollbackPossible
        } else {
            RollbackClassification::Ok
        }
    }
}

impl fmt::Display for RollbackClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`simulate_rollback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    /// Severity.
    pub classification: RollbackClassification,
    /// Mode the caller asked for.
    pub mode: RollbackMode,
    /// Distinct paths in the current inventory.
    pub cur_count: usize,
    /// Distinct paths in the candidate inventory.
    pub cand_count: usize,
    /// Current paths absent from the candidate.
    pub missing_count: usize,
    /// Paths in both with differing digests.
    pub changed_count: usize,
    /// Heuristic score behind the classification.
    pub score: u32,
}

impl RollbackReport {
    /// Whether the caller should refuse the candidate.
    ///
    /// `hard-fail` blocks on any anomaly, `quarantine` only on a suspect one.
    pub fn is_blocking(&self) -> bool {
        match self.mode {
            RollbackMode::HardFail => self.classification != RollbackClassification::Ok,
            RollbackMode::Quarantine => {
                self.classification == RollbackClassification::RollbackSuspect
            }
        }
    }

    /// `rollback_suspected` signal: OK passes, POSSIBLE warns, SUSPECT fails.
    pub fn to_signal(&self) -> Signal {
        let evidence = vec![self.to_string()];
        match self.classification {
            RollbackClassification::Ok => {
                Signal::pass(SIGNAL_ROLLBACK_SUSPECTED, WEIGHT_ROLLBACK_SUSPECTED, evidence)
            }
            RollbackClassification::RollbackPossible => {
                Signal::warn(SIGNAL_ROLLBACK_SUSPECTED, WEIGHT_ROLLBACK_SUSPECTED, evidence)
            }
            RollbackClassification::RollbackSuspect => {
                Signal::fail(SIGNAL_ROLLBACK_SUSPECTED, WEIGHT_ROLLBACK_SUSPECTED, evidence)
            }
        }
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mode={} cur={} cand={} missing={} changed={}",
            self.classification,
            self.mode,
            self.cur_count,
            self.cand_count,
            self.missing_count,
            self.changed_count
        )
    }
}

/// Compare a trusted `current` inventory with a `candidate` replacement.
///
/// The comparison is directional: files the candidate adds are not scored,
/// files it drops are.
pub fn simulate_rollback(
    current: &InventoryDocument,
    candidate: &InventoryDocument,
    mode: RollbackMode,
) -> RollbackReport {
    let cur = current.index();
    let cand = candidate.index();

    let mut missing_count = 0;
    let mut changed_count = 0;
    for (path, digest) in &cur {
        match cand.get(path) {
            None => missing_count += 1,
            Some(other) if other != digest => changed_count += 1,
            Some(_) => {}
        }
    }

    let cur_count = cur.len();
    let cand_count = cand.len();
    let changed_floor = MIN_CHANGED_FLOOR.max(cur_count / CHANGED_FRACTION_DIVISOR);

    let mut score = 0;
    if cand_count < cur_count {
        score += SCORE_FEWER_FILES;
    }
    if missing_count > 0 {
        score += SCORE_MISSING_FILES;
    }
    if changed_count > changed_floor {
        score += SCORE_MANY_CHANGED;
    }

    let report = RollbackReport {
        classification: RollbackClassification::from_score(score),
        mode,
        cur_count,
        cand_count,
        missing_count,
        changed_count,
        score,
    };
    tracing::debug!(%report, score, "rollback simulation finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(files: &[(&str, &str)]) -> InventoryDocument {
        InventoryDocument::from_entries(
            files
                .iter()
                .map(|(p, d)| (p.to_string(), d.to_string())),
        )
    }

    #[test]
    fn mode_parses_and_prints() {
        assert_eq!("hard-fail".parse::<RollbackMode>().unwrap(), RollbackMode::HardFail);
        assert_eq!("quarantine".parse::<RollbackMode>().unwrap(), RollbackMode::Quarantine);
        assert!("soft".parse::<RollbackMode>().is_err());
        assert_eq!(RollbackMode::HardFail.to_string(), "hard-fail");
    }

    #[test]
    fn new_files_alone_are_ok() {
        let cur = inv(&[("a", "1")]);
        let cand = inv(&[("a", "1"), ("b", "2")]);
        let report = simulate_rollback(&cur, &cand, RollbackMode::HardFail);
        assert_eq!(report.classification, RollbackClassification::Ok);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn missing_without_shrinking_is_possible() {
        let cur = inv(&[("a", "1"), ("b", "2")]);
        let cand = inv(&[("a", "1"), ("c", "3")]);
        let report = simulate_rollback(&cur, &cand, RollbackMode::HardFail);
        assert_eq!(report.missing_count, 1);
        assert_eq!(report.score, 2);
        assert_eq!(report.classification, RollbackClassification::RollbackPossible);
    }

    #[test]
    fn changed_threshold_uses_floor_of_three() {
        let cur = inv(&[("a", "1"), ("b", "1"), ("c", "1"), ("d", "1")]);
        let three = inv(&[("a", "2"), ("b", "2"), ("c", "2"), ("d", "1")]);
        let four = inv(&[("a", "2"), ("b", "2"), ("c", "2"), ("d", "2")]);

        let report = simulate_rollback(&cur, &three, RollbackMode::HardFail);
        assert_eq!(report.changed_count, 3);
        assert_eq!(report.classification, RollbackClassification::Ok);

        let report = simulate_rollback(&cur, &four, RollbackMode::HardFail);
        assert_eq!(report.changed_count, 4);
        assert_eq!(report.score, 1);
        assert_eq!(report.classification, RollbackClassification::RollbackPossible);
    }

    #[test]
    fn duplicate_paths_collapse_to_last_entry() {
        let mut cur = inv(&[("a", "1")]);
        cur.files.push(tfws_core::InventoryEntry {
            path: "a".into(),
            digest: "2".into(),
        });
        let cand = inv(&[("a", "2")]);
        let report = simulate_rollback(&cur, &cand, RollbackMode::HardFail);
        assert_eq!(report.cur_count, 1);
        assert_eq!(report.changed_count, 0);
        assert_eq!(report.classification, RollbackClassification::Ok);
    }

    #[test]
    fn blocking_depends_on_mode() {
        let cur = inv(&[("a", "1"), ("b", "2")]);
        let cand = inv(&[("a", "1"), ("c", "3")]);

        let hard = simulate_rollback(&cur, &cand, RollbackMode::HardFail);
        let soft = simulate_rollback(&cur, &cand, RollbackMode::Quarantine);
        assert_eq!(hard.classification, soft.classification);
        assert!(hard.is_blocking());
        assert!(!soft.is_blocking());

        let shrunk = simulate_rollback(&cur, &inv(&[("a", "1")]), RollbackMode::Quarantine);
        assert_eq!(shrunk.classification, RollbackClassification::RollbackSuspect);
        assert!(shrunk.is_blocking());
    }

    #[test]
    fn display_and_wire_form() {
        let cur = inv(&[("a", "1"), ("b", "2")]);
        let cand = inv(&[("a", "1")]);
        let report = simulate_rollback(&cur, &cand, RollbackMode::Quarantine);
        assert_eq!(
            report.to_string(),
            "ROLLBACK_SUSPECT mode=quarantine cur=2 cand=1 missing=1 changed=0"
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["classification"], "ROLLBACK_SUSPECT");
        assert_eq!(value["mode"], "quarantine");
        assert_eq!(value["curCount"], 2);
        assert_eq!(value["missingCount"], 1);
    }

    #[test]
    fn signal_follows_classification() {
        let cur = inv(&[("a", "1"), ("b", "2")]);
        let ok = simulate_rollback(&cur, &cur, RollbackMode::HardFail).to_signal();
        assert_eq!(ok.token(), "rollback_suspected:pass");

        let possible =
            simulate_rollback(&cur, &inv(&[("a", "1"), ("c", "3")]), RollbackMode::HardFail);
        assert_eq!(possible.to_signal().token(), "rollback_suspected:warn");

        let suspect = simulate_rollback(&cur, &inv(&[]), RollbackMode::HardFail).to_signal();
        assert_eq!(suspect.token(), "rollback_suspected:fail");
        assert_eq!(suspect.weight, 15.0);
    }
}
