//! Error types for the verifier crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::{format_violations, SchemaViolation};

/// Verifier error type.
///
/// Every variant is an input malformation or a missing artifact; failed
/// checks are reported as values, not errors.
#[derive(Error, Debug)]
pub enum VerifierError {
    /// File could not be read or written.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// File is not valid JSON for the expected document.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: tfws_core::CoreError,
    },

    /// Neither `<name>.k1-provider.minisig` nor `<name>.minisig` exists.
    #[error("no_signature_found for {name} in {}", .dir.display())]
    NoSignatureFound {
        /// Inventory file name.
        name: String,
        /// Directory searched.
        dir: PathBuf,
    },

    /// Schema document could not be compiled.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Instance does not satisfy the schema.
    #[error("Validation failed:\n{}", format_violations(.0, crate::schema::MAX_REPORTED_VIOLATIONS))]
    SchemaViolations(Vec<SchemaViolation>),
}

impl VerifierError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VerifierError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: impl Into<tfws_core::CoreError>) -> Self {
        VerifierError::Parse {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Result type alias for VerifierError.
pub type Result<T> = std::result::Result<T, VerifierError>;
