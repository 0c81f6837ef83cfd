//! TFWS integrity verifier.
//!
//! Independent checks whose results are folded into the signal set before
//! scoring:
//! - key epoch validation against a key history
//! - rollback / replay detection between two inventories
//! - detached signature discovery and delegated verification of inventories
//!
//! Plus the collaborators those checks rely on: the inventory hashwalk and
//! JSON-Schema validation with the bundled TFWS schemas.

#![warn(missing_docs)]

pub mod error;
pub mod hashwalk;
pub mod key_epoch;
pub mod rollback;
pub mod schema;
pub mod signature;

pub use error::{Result, VerifierError};
pub use hashwalk::{hashwalk, load_inventory, write_inventory};
pub use key_epoch::{check_key_epoch, load_key_history, KeyEpochCheck, KeyEpochReason};
pub use rollback::{simulate_rollback, RollbackClassification, RollbackMode, RollbackReport};
pub use schema::{
    format_violations, validate_document, validate_files, SchemaViolation,
    MAX_REPORTED_VIOLATIONS,
};
pub use signature::{
    missing_signature_signal, pick_signature, verify_inventory, InventoryVerification,
    MinisignCli, SignatureVerifier, VerifyOutcome,
};
