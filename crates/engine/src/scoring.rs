//! Scoring & grading: signals => value, confidence, grade.
//!
//! The whole rule set is data. [`ScoringTable::default`] encodes:
//! - start at 50, `pass` adds `abs(weight)`, `fail` subtracts it, `warn`/`unknown` add nothing
//! - clamp to `[0, 100]`
//! - `confidence = min(1, 0.25 + 0.15 * #definite)` where definite = pass or fail
//! - `A >= 90, B >= 80, C >= 70, D >= 60, E >= 50`, else `F`

use serde::{Deserialize, Serialize};
use tfws_core::{Grade, Score, Signal, SignalResult};

/// How one signal result moves the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultRule {
    /// Multiplier applied to `abs(weight)`.
    pub sign: f64,
    /// Whether the result counts toward confidence.
    pub counts_toward_confidence: bool,
}

/// Per-result rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultRules {
    /// Rule for `pass`.
    pub pass: ResultRule,
    /// Rule for `fail`.
    pub fail: ResultRule,
    /// Rule for `warn`.
    pub warn: ResultRule,
    /// Rule for `unknown`.
    pub unknown: ResultRule,
}

impl ResultRules {
    /// Rule for `result`.
    pub const fn get(&self, result: SignalResult) -> ResultRule {
        match result {
            SignalResult::Pass => self.pass,
            SignalResult::Fail => self.fail,
            SignalResult::Warn => self.warn,
            SignalResult::Unknown => self.unknown,
        }
    }
}

impl Default for ResultRules {
    fn default() -> Self {
        let neutral = ResultRule {
            sign: 0.0,
            counts_toward_confidence: false,
        };
        Self {
            pass: ResultRule {
                sign: 1.0,
                counts_toward_confidence: true,
            },
            fail: ResultRule {
                sign: -1.0,
                counts_toward_confidence: true,
            },
            warn: neutral,
            unknown: neutral,
        }
    }
}

/// Inclusive lower bound for a grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThreshold {
    /// Grade awarded at or above `min`.
    pub grade: Grade,
    /// Inclusive lower bound.
    pub min: f64,
}

/// Scoring table validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoringTableError {
    /// Grade bounds must be strictly descending so the step function is monotonic.
    #[error("invalid grade thresholds: {prev} ({prev_min}) must be above {next} ({next_min})")]
    NotDescending {
        prev: Grade,
        prev_min: f64,
        next: Grade,
        next_min: f64,
    },
    /// Bounds and the base value must lie in `[0, 100]`.
    #[error("invalid scoring table: {field} = {value} is outside [0, 100]")]
    OutOfRange { field: &'static str, value: f64 },
    /// Confidence parameters must keep confidence inside `[0, 1]`.
    #[error("invalid confidence parameters: floor {floor}, step {step}, cap {cap}")]
    Confidence { floor: f64, step: f64, cap: f64 },
    /// `UNKNOWN` is never awarded by scoring.
    #[error("grade UNKNOWN cannot appear in the scoring table")]
    UnknownGrade,
}

/// Tunable scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTable {
    /// Starting value.
    pub base: f64,
    /// Confidence with zero definite signals.
    pub confidence_floor: f64,
    /// Confidence added per definite signal.
    pub confidence_step: f64,
    /// Confidence ceiling.
    pub confidence_cap: f64,
    /// Weight-sign rule per result.
    pub rules: ResultRules,
    /// Grade bounds, best first.
    pub grades: Vec<GradeThreshold>,
    /// Grade below every bound.
    pub floor_grade: Grade,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            base: 50.0,
            confidence_floor: 0.25,
            confidence_step: 0.15,
            confidence_cap: 1.0,
            rules: ResultRules::default(),
            grades: vec![
                GradeThreshold {
                    grade: Grade::A,
                    min: 90.0,
                },
                GradeThreshold {
                    grade: Grade::B,
                    min: 80.0,
                },
                GradeThreshold {
                    grade: Grade::C,
                    min: 70.0,
                },
                GradeThreshold {
                    grade: Grade::D,
                    min: 60.0,
                },
                GradeThreshold {
                    grade: Grade::E,
                    min: 50.0,
                },
            ],
            floor_grade: Grade::F,
        }
    }
}

impl ScoringTable {
    /// Check the table describes a monotonic step function inside the score range.
    pub fn validate(&self) -> Result<(), ScoringTableError> {
        if !(0.0..=100.0).contains(&self.base) {
            return Err(ScoringTableError::OutOfRange {
                field: "base",
                value: self.base,
            });
        }
        let confidence_ok = (0.0..=1.0).contains(&self.confidence_floor)
            && (0.0..=1.0).contains(&self.confidence_cap)
            && self.confidence_step >= 0.0
            && self.confidence_floor <= self.confidence_cap;
        if !confidence_ok {
            return Err(ScoringTableError::Confidence {
                floor: self.confidence_floor,
                step: self.confidence_step,
                cap: self.confidence_cap,
            });
        }
        if self.floor_grade == Grade::Unknown {
            return Err(ScoringTableError::UnknownGrade);
        }
        for threshold in &self.grades {
            if threshold.grade == Grade::Unknown {
                return Err(ScoringTableError::UnknownGrade);
            }
            if !(0.0..=100.0).contains(&threshold.min) {
                return Err(ScoringTableError::OutOfRange {
                    field: "grades.min",
                    value: threshold.min,
                });
            }
        }
        for pair in self.grades.windows(2) {
            if pair[0].min <= pair[1].min || !pair[1].grade.is_worse_than(pair[0].grade) {
                return Err(ScoringTableError::NotDescending {
                    prev: pair[0].grade,
                    prev_min: pair[0].min,
                    next: pair[1].grade,
                    next_min: pair[1].min,
                });
            }
        }
        Ok(())
    }

    /// Grade for a value: the first bound (best first) the value reaches.
    pub fn grade_for(&self, value: f64) -> Grade {
        self.grades
            .iter()
            .find(|t| value >= t.min)
            .map(|t| t.grade)
            .unwrap_or(self.floor_grade)
    }

    /// Confidence for a number of definite signals.
    pub fn confidence_for(&self, definite: usize) -> f64 {
        (self.confidence_floor + self.confidence_step * definite as f64).min(self.confidence_cap)
    }

    /// Score a signal set with this table.
    ///
    /// Contributions are summed in sorted order so the result does not depend
    /// on the order of `signals`.
    pub fn score(&self, signals: &[Signal]) -> Score {
        let mut contributions = Vec::with_capacity(signals.len());
        let mut definite = 0usize;

        for signal in signals {
            let rule = self.rules.get(signal.result);
            let magnitude = if signal.weight.is_finite() {
                signal.weight.abs()
            } else {
                0.0
            };
            let contribution = rule.sign * magnitude;
            if contribution != 0.0 {
                contributions.push(contribution);
            }
            if rule.counts_toward_confidence {
                definite += 1;
            }
        }

        contributions.sort_by(f64::total_cmp);
        let value = (self.base + contributions.iter().sum::<f64>()).clamp(0.0, 100.0);

        Score {
            value,
            confidence: self.confidence_for(definite),
            grade: self.grade_for(value),
        }
    }
}

/// Score a signal set with the default table.
pub fn score(signals: &[Signal]) -> Score {
    ScoringTable::default().score(signals)
}

/// Grade a value with the default table.
pub fn grade_for(value: f64) -> Grade {
    ScoringTable::default().grade_for(value)
}
