//! Core types for TFWS: signals, grades, scores, trust states and policies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_MIN_CONFIDENCE_ALLOW, SCHEMA_VERSION};
use crate::error::CoreError;

/// Categorical outcome of one piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalResult {
    /// The check succeeded.
    Pass,
    /// The check failed.
    Fail,
    /// The check produced a definite but non-conclusive answer.
    Warn,
    /// The check could not produce an answer.
    Unknown,
}

impl SignalResult {
    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignalResult::Pass => "pass",
            SignalResult::Fail => "fail",
            SignalResult::Warn => "warn",
            SignalResult::Unknown => "unknown",
        }
    }

    /// Whether this result is a definite pass/fail answer.
    pub const fn is_definite(&self) -> bool {
        matches!(self, SignalResult::Pass | SignalResult::Fail)
    }
}

impl fmt::Display for SignalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalResult {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(SignalResult::Pass),
            "fail" => Ok(SignalResult::Fail),
            "warn" => Ok(SignalResult::Warn),
            "unknown" => Ok(SignalResult::Unknown),
            other => Err(CoreError::InvalidResult(other.to_string())),
        }
    }
}

/// One unit of evidence about a subject.
///
/// The weight is an advisory magnitude: its sign never matters, the direction
/// of its contribution comes from [`Signal::result`]. Deserialized signals are
/// accepted as-is; scoring always uses `abs(weight)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Stable identifier namespaced by concern (e.g. `well_known_present`).
    pub code: String,
    /// Advisory magnitude.
    pub weight: f64,
    /// Outcome.
    pub result: SignalResult,
    /// Ordered evidence pointers.
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl Signal {
    /// Create a signal, validating the weight.
    pub fn new(
        code: impl Into<String>,
        weight: f64,
        result: SignalResult,
        evidence: Vec<String>,
    ) -> Result<Self, CoreError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(CoreError::InvalidWeight(weight));
        }
        Ok(Self {
            code: code.into(),
            weight,
            result,
            evidence,
        })
    }

    fn with(code: &str, weight: f64, result: SignalResult, evidence: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            weight: weight.abs(),
            result,
            evidence,
        }
    }

    /// Passing signal.
    pub fn pass(code: &str, weight: f64, evidence: Vec<String>) -> Self {
        Self::with(code, weight, SignalResult::Pass, evidence)
    }

    /// Failing signal.
    pub fn fail(code: &str, weight: f64, evidence: Vec<String>) -> Self {
        Self::with(code, weight, SignalResult::Fail, evidence)
    }

    /// Warning signal.
    pub fn warn(code: &str, weight: f64, evidence: Vec<String>) -> Self {
        Self::with(code, weight, SignalResult::Warn, evidence)
    }

    /// Signal whose check produced no answer.
    pub fn unknown(code: &str, weight: f64, evidence: Vec<String>) -> Self {
        Self::with(code, weight, SignalResult::Unknown, evidence)
    }

    /// `code:result` token as reported in decisions.
    pub fn token(&self) -> String {
        format!("{}:{}", self.code, self.result)
    }
}

/// `code:result` tokens for every signal, in signal order.
pub fn signal_codes(signals: &[Signal]) -> Vec<String> {
    signals
        .iter()
        .filter(|s| !s.code.is_empty())
        .map(Signal::token)
        .collect()
}

/// Whether any signal carries exactly `code`, regardless of its result.
pub fn has(signals: &[Signal], code: &str) -> bool {
    signals.iter().any(|s| s.code == code)
}

/// Letter summary of a numeric trust score.
///
/// Ordering is `A > B > C > D > E > F > UNKNOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Score >= 90.
    A,
    /// Score >= 80.
    B,
    /// Score >= 70.
    C,
    /// Score >= 60.
    D,
    /// Score >= 50.
    E,
    /// Score < 50.
    F,
    /// Not graded.
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Grade {
    /// Every grade, best first.
    pub const ALL: [Grade; 7] = [
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::E,
        Grade::F,
        Grade::Unknown,
    ];

    /// Canonical string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
            Grade::Unknown => "UNKNOWN",
        }
    }

    /// Rank where higher is better (`A = 6`, `UNKNOWN = 0`).
    pub const fn rank(&self) -> u8 {
        match self {
            Grade::A => 6,
            Grade::B => 5,
            Grade::C => 4,
            Grade::D => 3,
            Grade::E => 2,
            Grade::F => 1,
            Grade::Unknown => 0,
        }
    }

    /// True if `self` ranks strictly below `other`.
    pub const fn is_worse_than(&self, other: Grade) -> bool {
        self.rank() < other.rank()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| CoreError::InvalidGrade(s.to_string()))
    }
}

/// Numeric score, confidence and grade derived from a signal set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Value in `[0, 100]`.
    pub value: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Letter grade.
    pub grade: Grade,
}

/// Entity being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject kind, e.g. `domain`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Subject identifier, e.g. `example.com`.
    pub id: String,
}

impl Subject {
    /// Domain subject.
    pub fn domain(id: impl Into<String>) -> Self {
        Self {
            ty: crate::constants::SUBJECT_TYPE_DOMAIN.to_string(),
            id: id.into(),
        }
    }
}

/// Trust evaluation of one subject at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustState {
    /// Document version.
    pub schema_version: String,
    /// Evaluated subject.
    pub subject: Subject,
    /// When the state was computed.
    #[serde(with = "rfc3339")]
    pub computed_at: DateTime<Utc>,
    /// End of the validity window.
    #[serde(with = "rfc3339")]
    pub valid_until: DateTime<Utc>,
    /// Score derived from `signals`.
    pub score: Score,
    /// Evidence.
    pub signals: Vec<Signal>,
}

impl TrustState {
    /// `code:result` tokens for every signal.
    pub fn signal_codes(&self) -> Vec<String> {
        signal_codes(&self.signals)
    }

    /// Whether any signal carries `code`.
    pub fn has(&self, code: &str) -> bool {
        has(&self.signals, code)
    }

    /// Whether `at` falls inside `[computed_at, valid_until]`.
    pub fn is_fresh_at(&self, at: DateTime<Utc>) -> bool {
        self.computed_at <= at && at <= self.valid_until
    }

    /// Whether this document declares the supported schema version.
    pub fn is_current_version(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

fn default_min_grade_allow() -> Grade {
    Grade::B
}

fn default_min_confidence_allow() -> f64 {
    DEFAULT_MIN_CONFIDENCE_ALLOW
}

/// Admission policy supplied whole per decision call.
///
/// Code sets are `BTreeSet`s so every gate iterates them lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Codes that block on `fail`/`warn`.
    #[serde(default)]
    pub block_on: BTreeSet<String>,
    /// Codes that quarantine on `fail`/`warn`/`unknown`.
    #[serde(default)]
    pub quarantine_on: BTreeSet<String>,
    /// Codes that warn on `fail`/`warn`/`unknown`.
    #[serde(default)]
    pub warn_on: BTreeSet<String>,
    /// Worst grade still allowed.
    #[serde(default = "default_min_grade_allow")]
    pub min_grade_allow: Grade,
    /// Lowest confidence that does not warn.
    #[serde(default = "default_min_confidence_allow")]
    pub min_confidence_allow: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            block_on: BTreeSet::new(),
            quarantine_on: BTreeSet::new(),
            warn_on: BTreeSet::new(),
            min_grade_allow: default_min_grade_allow(),
            min_confidence_allow: default_min_confidence_allow(),
        }
    }
}

impl Policy {
    /// Reject policies whose confidence floor lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.min_confidence_allow) {
            return Err(CoreError::InvalidConfidence(self.min_confidence_allow));
        }
        Ok(())
    }

    /// Parse and validate a policy document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let policy: Policy = serde_json::from_slice(bytes)?;
        policy.validate()?;
        Ok(policy)
    }
}

/// Parse an RFC 3339 timestamp (a trailing `Z` or any offset) into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("{s}: {e}")))
}

/// Canonical wire form: second precision with a `Z` suffix.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Serde adapter for RFC 3339 timestamps in canonical wire form.
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(dt))
    }

    /// Deserialize any RFC 3339 timestamp into UTC.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    /// Same adapter for optional timestamps.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize `Some` as a canonical timestamp and `None` as null.
        pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match dt {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize null, an empty string or a missing field as `None`.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => super::super::parse_timestamp(s)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
            }
        }
    }
}
