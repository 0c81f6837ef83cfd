//! Build inventories by hashing a directory tree.

use std::fs;
use std::path::{Path, PathBuf};
use tfws_core::{sha256_file, InventoryDocument};

use crate::error::{Result, VerifierError};

const SKIPPED_DIR: &str = ".git";

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| VerifierError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| VerifierError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| VerifierError::io(&path, e))?;

        if file_type.is_dir() {
            if entry.file_name() != SKIPPED_DIR {
                collect_files(&path, files)?;
            }
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            files.push(path);
        }
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hash every regular file under `root` into a canonical inventory.
///
/// `.git` directories are skipped, symlinked directories are not followed.
pub fn hashwalk(root: &Path) -> Result<InventoryDocument> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    let mut entries = Vec::with_capacity(files.len());
    for path in &files {
        let digest = sha256_file(path).map_err(|e| VerifierError::io(path, e))?;
        entries.push((relative_path(root, path), digest));
    }

    let doc = InventoryDocument::from_entries(entries);
    tracing::info!(root = %root.display(), count = doc.count, "hashwalk complete");
    Ok(doc)
}

/// Write `doc` as pretty JSON.
pub fn write_inventory(doc: &InventoryDocument, out: &Path) -> Result<()> {
    let json = doc.to_json_pretty().map_err(|e| VerifierError::parse(out, e))?;
    fs::write(out, json + "\n").map_err(|e| VerifierError::io(out, e))
}

/// Read and parse an inventory document.
pub fn load_inventory(path: &Path) -> Result<InventoryDocument> {
    let bytes = fs::read(path).map_err(|e| VerifierError::io(path, e))?;
    InventoryDocument::from_json_slice(&bytes).map_err(|e| VerifierError::parse(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tfws_core::sha256_hex;

    fn tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join(".github")).unwrap();
        fs::write(root.join("z.txt"), b"last").unwrap();
        fs::write(root.join("a.txt"), b"first").unwrap();
        fs::write(root.join("docs/nested/deep.md"), b"# deep").unwrap();
        fs::write(root.join(".git/HEAD"), b"ref: refs/heads/main").unwrap();
        fs::write(root.join(".github/ci.yml"), b"on: push").unwrap();
        tmp
    }

    #[test]
    fn walks_sorted_and_skips_git() {
        let tmp = tree();
        let doc = hashwalk(tmp.path()).unwrap();

        let paths: Vec<_> = doc.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![".github/ci.yml", "a.txt", "docs/nested/deep.md", "z.txt"]
        );
        assert_eq!(doc.count, 4);
        assert_eq!(doc.root, ".");
        assert_eq!(doc.algo, "sha256");
        assert_eq!(doc.files[1].digest, sha256_hex(b"first"));
    }

    #[test]
    fn written_inventory_reloads_identically() {
        let tmp = tree();
        let doc = hashwalk(tmp.path()).unwrap();
        let out = tmp.path().join("sha256.json");
        write_inventory(&doc, &out).unwrap();

        let loaded = load_inventory(&out).unwrap();
        assert_eq!(loaded, doc);
        assert!(loaded.is_canonical());
    }

    #[test]
    fn missing_root_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = hashwalk(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, VerifierError::Io { .. }));
    }

    #[test]
    fn malformed_inventory_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, br#"{"files":[{"path":"a"}]}"#).unwrap();
        assert!(matches!(
            load_inventory(&path).unwrap_err(),
            VerifierError::Parse { .. }
        ));
    }
}
