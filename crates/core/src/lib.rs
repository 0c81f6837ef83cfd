//! # TFWS Core
//!
//! Shared vocabulary for TFWS v2 trust evaluation: the signal/evidence model,
//! scores and grades, trust states, admission policies, key histories and
//! artifact inventories.
//!
//! Every other crate in the workspace consumes or produces these types:
//!
//! - **Signals**: `Signal`, `SignalResult`, `signal_codes`, `has`
//! - **Scoring output**: `Score`, `Grade`
//! - **Documents**: `TrustState`, `Policy`, `KeyHistory`, `InventoryDocument`
//! - **Constants**: signal codes, weights and wire versions
//! - **Hashing**: SHA-256 helpers for inventories
//!
//! This crate performs no network access and holds no state.

#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod hashing;
pub mod inventory;
pub mod keys;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use error::{CoreError, Result};
pub use hashing::{sha256_file, sha256_hex};
pub use inventory::{InventoryDocument, InventoryEntry};
pub use keys::{KeyHistory, KeyRecord, KeyStatus};
pub use types::*;
