//! JSON-Schema validation (draft 2020-12) and the bundled TFWS schemas.

use jsonschema::{Draft, JSONSchema};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Result, VerifierError};

/// Most violations a CLI report lists.
pub const MAX_REPORTED_VIOLATIONS: usize = 50;

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON pointer into the instance (empty for the root).
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

/// Render up to `limit` violations as `- <path>: <message>` lines.
pub fn format_violations(violations: &[SchemaViolation], limit: usize) -> String {
    let mut out = String::new();
    for (i, v) in violations.iter().take(limit).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let path = if v.path.is_empty() { "/" } else { &v.path };
        let _ = write!(out, "- {}: {}", path, v.message);
    }
    if violations.len() > limit {
        let _ = write!(out, "\n... and {} more", violations.len() - limit);
    }
    out
}

fn compile(schema: &Value) -> Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft202012)
        .compile(schema)
        .map_err(|e| VerifierError::InvalidSchema(e.to_string()))
}

/// Every violation of `instance` against `schema`, sorted by instance path.
pub fn violations(schema: &Value, instance: &Value) -> Result<Vec<SchemaViolation>> {
    let compiled = compile(schema)?;
    let mut found: Vec<SchemaViolation> = match compiled.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| SchemaViolation {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect(),
    };
    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

/// Validate `instance`, failing with every violation.
pub fn validate_document(schema: &Value, instance: &Value) -> Result<()> {
    let found = violations(schema, instance)?;
    if found.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = found.len(), "schema validation failed");
        Err(VerifierError::SchemaViolations(found))
    }
}

/// Read a JSON file.
pub fn load_json(path: &Path) -> Result<Value> {
    let bytes = std::fs::read(path).map_err(|e| VerifierError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| VerifierError::parse(path, e))
}

/// Load a schema and a document from disk and validate one against the other.
pub fn validate_files(schema_path: &Path, json_path: &Path) -> Result<()> {
    let schema = load_json(schema_path)?;
    let instance = load_json(json_path)?;
    validate_document(&schema, &instance)
}

/// Schemas shipped with the crate.
pub mod bundled {
    use serde_json::Value;

    use crate::error::{Result, VerifierError};

    /// Trust-state document schema.
    pub const TRUST_STATE: &str = include_str!("../../../schemas/trust-state.schema.json");
    /// Key history document schema.
    pub const KEY_HISTORY: &str = include_str!("../../../schemas/key-history.schema.json");
    /// Inventory document schema.
    pub const INVENTORY: &str = include_str!("../../../schemas/inventory.schema.json");
    /// Policy document schema.
    pub const POLICY: &str = include_str!("../../../schemas/policy.schema.json");
    /// Decision document schema.
    pub const DECISION: &str = include_str!("../../../schemas/decision.schema.json");

    /// `(name, source)` for every bundled schema.
    pub const ALL: [(&str, &str); 5] = [
        ("trust-state", TRUST_STATE),
        ("key-history", KEY_HISTORY),
        ("inventory", INVENTORY),
        ("policy", POLICY),
        ("decision", DECISION),
    ];

    fn parse(name: &str, source: &str) -> Result<Value> {
        serde_json::from_str(source)
            .map_err(|e| VerifierError::InvalidSchema(format!("{name}: {e}")))
    }

    /// Look a bundled schema up by name.
    pub fn by_name(name: &str) -> Result<Value> {
        let (name, source) = ALL
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| VerifierError::InvalidSchema(format!("unknown bundled schema: {name}")))?;
        parse(name, source)
    }

    /// Parsed trust-state schema.
    pub fn trust_state() -> Result<Value> {
        parse("trust-state", TRUST_STATE)
    }
}
