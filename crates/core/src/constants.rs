//! Canonical constants for TFWS v2.
//!
//! Signal codes and document versions are part of the wire contract: policies
//! reference the codes verbatim, and schemas pin the version strings.

/// Schema version carried by trust-state and inventory documents.
pub const SCHEMA_VERSION: &str = "2.0";

/// Subject type used by the domain trust endpoint.
pub const SUBJECT_TYPE_DOMAIN: &str = "domain";

/// Default validity window of a computed trust state, in days.
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

/// Longest configurable validity window, in days.
pub const MAX_VALIDITY_DAYS: i64 = 36_500;

/// Inventory digest algorithm label.
pub const INVENTORY_ALGO_SHA256: &str = "sha256";

/// Inventory root label written by the hashwalk.
pub const INVENTORY_ROOT: &str = ".";

// Signal codes

/// The generated payload validated against the trust-state schema.
pub const SIGNAL_SCHEMA_VALID: &str = "schema_valid";

/// `/.well-known/ai-trust-hub.json` is served by the subject.
pub const SIGNAL_WELL_KNOWN_PRESENT: &str = "well_known_present";

/// The published inventory carries a valid detached signature.
pub const SIGNAL_INVENTORY_SIGNED: &str = "inventory_signed";

/// The signing key identifier is inside its epoch and not revoked.
pub const SIGNAL_KEY_EPOCH_VALID: &str = "key_epoch_valid";

/// The candidate inventory looks like a rollback or replay of an older one.
pub const SIGNAL_ROLLBACK_SUSPECTED: &str = "rollback_suspected";

// Signal weights

/// Weight of [`SIGNAL_SCHEMA_VALID`].
pub const WEIGHT_SCHEMA_VALID: f64 = 10.0;

/// Weight of [`SIGNAL_WELL_KNOWN_PRESENT`].
pub const WEIGHT_WELL_KNOWN_PRESENT: f64 = 10.0;

/// Weight of [`SIGNAL_INVENTORY_SIGNED`].
pub const WEIGHT_INVENTORY_SIGNED: f64 = 15.0;

/// Weight of [`SIGNAL_KEY_EPOCH_VALID`].
pub const WEIGHT_KEY_EPOCH_VALID: f64 = 10.0;

/// Weight of [`SIGNAL_ROLLBACK_SUSPECTED`].
pub const WEIGHT_ROLLBACK_SUSPECTED: f64 = 15.0;

// Evidence pointers for the baseline placeholders

/// Path probed on the subject for the trust hub document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/ai-trust-hub.json";

/// Evidence for [`SIGNAL_SCHEMA_VALID`].
pub const EVIDENCE_TRUST_STATE_SCHEMA: &str = "schemas/trust-state.schema.json";

/// Evidence for an unchecked [`SIGNAL_INVENTORY_SIGNED`].
pub const EVIDENCE_INVENTORY_SIGNATURE: &str = "sha256.json.minisig (optional)";

/// Evidence for an unchecked [`SIGNAL_KEY_EPOCH_VALID`].
pub const EVIDENCE_KEY_HISTORY: &str = "key-history.json (optional)";

// Policy defaults

/// Default `min_confidence_allow` when a policy omits it.
pub const DEFAULT_MIN_CONFIDENCE_ALLOW: f64 = 0.6;
