//! Inventory documents: sorted manifests of file paths and content digests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{INVENTORY_ALGO_SHA256, INVENTORY_ROOT, SCHEMA_VERSION};
use crate::error::CoreError;
use crate::hashing::sha256_hex;

/// One file in an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Path relative to the inventory root, `/`-separated.
    pub path: String,
    /// Lowercase hex digest of the file contents.
    #[serde(rename = "sha256", alias = "digest")]
    pub digest: String,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_root() -> String {
    INVENTORY_ROOT.to_string()
}

fn default_algo() -> String {
    INVENTORY_ALGO_SHA256.to_string()
}

/// Snapshot of published artifacts.
///
/// The canonical form has `files` sorted by path and `count == files.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDocument {
    /// Document version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Root label the paths are relative to.
    #[serde(default = "default_root")]
    pub root: String,
    /// Digest algorithm.
    #[serde(default = "default_algo")]
    pub algo: String,
    /// Number of files.
    #[serde(default)]
    pub count: usize,
    /// File entries.
    #[serde(default)]
    pub files: Vec<InventoryEntry>,
}

impl InventoryDocument {
    /// Build a canonical SHA-256 inventory from `(path, digest)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut doc = Self {
            schema_version: default_schema_version(),
            root: default_root(),
            algo: default_algo(),
            count: 0,
            files: entries
                .into_iter()
                .map(|(path, digest)| InventoryEntry { path, digest })
                .collect(),
        };
        doc.canonicalize();
        doc
    }

    /// Sort files by path and fix `count`.
    pub fn canonicalize(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self.count = self.files.len();
    }

    /// Whether files are sorted by unique path and `count` matches.
    pub fn is_canonical(&self) -> bool {
        self.count == self.files.len() && self.files.windows(2).all(|w| w[0].path < w[1].path)
    }

    /// Path → digest map. Duplicate paths: the last entry wins.
    pub fn index(&self) -> BTreeMap<&str, &str> {
        self.files
            .iter()
            .map(|f| (f.path.as_str(), f.digest.as_str()))
            .collect()
    }

    /// Parse an inventory document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty JSON in the on-disk form.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact JSON of the canonical form.
    pub fn digest(&self) -> Result<String, CoreError> {
        let mut canonical = self.clone();
        canonical.canonicalize();
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(sha256_hex(&bytes))
    }
}
