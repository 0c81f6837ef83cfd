//! TFWS decision engine.
//!
//! Turns a scored trust state plus an admission policy into exactly one
//! decision. Gates are evaluated in order and the first match wins:
//!
//! 1. `block_on`: a listed code has a `fail` or `warn` signal => BLOCK
//! 2. `quarantine_on`: a listed code has a `fail`, `warn` or `unknown` signal => QUARANTINE
//! 3. grade below `min_grade_allow` => BLOCK; else confidence below `min_confidence_allow` => WARN
//! 4. `warn_on`: a listed code has a `fail`, `warn` or `unknown` signal => WARN
//! 5. otherwise => ALLOW
//!
//! Within one gate, codes are tried in lexicographic order.

pub mod assess;
pub mod scoring;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tfws_core::{signal_codes, Grade, Policy, Score, Signal, SignalResult, TrustState};

pub use assess::{assess, baseline_signals, fold_signal, Assessor};
pub use scoring::{grade_for, score, ScoringTable, ScoringTableError};

/// A TFWS admission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Admit.
    Allow,
    /// Admit, but surface the concern.
    Warn,
    /// Hold for review.
    Quarantine,
    /// Refuse.
    Block,
}

impl Decision {
    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Warn => "warn",
            Decision::Quarantine => "quarantine",
            Decision::Block => "block",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which gate fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    /// Block gate matched this code.
    BlockOn(String),
    /// Quarantine gate matched this code.
    QuarantineOn(String),
    /// Grade below the policy minimum.
    GradeTooLow,
    /// Confidence below the policy minimum.
    LowConfidence,
    /// Warn gate matched this code.
    WarnOn(String),
    /// No gate matched.
    Pass,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::BlockOn(code) => write!(f, "policy:block_on:{code}"),
            DecisionReason::QuarantineOn(code) => write!(f, "policy:quarantine_on:{code}"),
            DecisionReason::GradeTooLow => f.write_str("policy:grade_too_low"),
            DecisionReason::LowConfidence => f.write_str("policy:low_confidence"),
            DecisionReason::WarnOn(code) => write!(f, "policy:warn_on:{code}"),
            DecisionReason::Pass => f.write_str("policy:pass"),
        }
    }
}

/// Decision result with explainability fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    /// Final decision.
    pub decision: Decision,
    /// `policy:...` reason string.
    pub reason: String,
    /// Every `code:result` token of the input, in signal order.
    pub observed: Vec<String>,
    /// Grade, echoed once the grade gate was reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    /// Confidence, echoed once the grade gate was reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl DecisionResult {
    /// `allow` and `warn` admit the subject.
    pub const fn is_admitted(&self) -> bool {
        matches!(self.decision, Decision::Allow | Decision::Warn)
    }
}

const BLOCK_RESULTS: &[SignalResult] = &[SignalResult::Fail, SignalResult::Warn];
const QUARANTINE_RESULTS: &[SignalResult] =
    &[SignalResult::Fail, SignalResult::Warn, SignalResult::Unknown];
const WARN_RESULTS: &[SignalResult] =
    &[SignalResult::Fail, SignalResult::Warn, SignalResult::Unknown];

/// Smallest listed code that has a signal with one of `results`.
fn first_matching<'a>(
    codes: &'a BTreeSet<String>,
    signals: &[Signal],
    results: &[SignalResult],
) -> Option<&'a str> {
    codes
        .iter()
        .find(|code| {
            signals
                .iter()
                .any(|s| s.code == **code && results.contains(&s.result))
        })
        .map(String::as_str)
}

/// Decide for a trust state, using the grade and confidence it carries.
pub fn decide(state: &TrustState, policy: &Policy) -> DecisionResult {
    decide_signals(&state.signals, &state.score, policy)
}

/// Decide for a bare signal set and its score.
pub fn decide_signals(signals: &[Signal], score: &Score, policy: &Policy) -> DecisionResult {
    let observed = signal_codes(signals);

    let early = |decision: Decision, reason: DecisionReason| DecisionResult {
        decision,
        reason: reason.to_string(),
        observed: observed.clone(),
        grade: None,
        confidence: None,
    };

    if let Some(code) = first_matching(&policy.block_on, signals, BLOCK_RESULTS) {
        return early(Decision::Block, DecisionReason::BlockOn(code.to_string()));
    }

    if let Some(code) = first_matching(&policy.quarantine_on, signals, QUARANTINE_RESULTS) {
        return early(
            Decision::Quarantine,
            DecisionReason::QuarantineOn(code.to_string()),
        );
    }

    let (decision, reason) = if score.grade.is_worse_than(policy.min_grade_allow) {
        (Decision::Block, DecisionReason::GradeTooLow)
    } else if score.confidence < policy.min_confidence_allow {
        (Decision::Warn, DecisionReason::LowConfidence)
    } else if let Some(code) = first_matching(&policy.warn_on, signals, WARN_RESULTS) {
        (Decision::Warn, DecisionReason::WarnOn(code.to_string()))
    } else {
        (Decision::Allow, DecisionReason::Pass)
    };

    DecisionResult {
        decision,
        reason: reason.to_string(),
        observed,
        grade: Some(score.grade),
        confidence: Some(score.confidence),
    }
}
