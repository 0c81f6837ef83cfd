//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Signal weight must be a finite, non-negative number.
    #[error("Invalid signal weight: {0} (must be finite and >= 0)")]
    InvalidWeight(f64),

    /// Confidence must lie in `[0, 1]`.
    #[error("Invalid confidence: {0} (must be between 0 and 1)")]
    InvalidConfidence(f64),

    /// Unknown signal result.
    #[error("Invalid signal result: {0} (expected pass, fail, warn or unknown)")]
    InvalidResult(String),

    /// Unknown grade letter.
    #[error("Invalid grade: {0} (expected A-F or UNKNOWN)")]
    InvalidGrade(String),

    /// Timestamp could not be parsed as RFC 3339.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
