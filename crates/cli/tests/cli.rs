use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn samples() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../schemas/samples")
}

fn sample(name: &str) -> String {
    samples().join(name).to_str().unwrap().to_string()
}

fn site(base: &Path, files: usize) -> PathBuf {
    let root = base.join(format!("site-{files}"));
    fs::create_dir_all(root.join("pages")).unwrap();
    for i in 0..files {
        fs::write(root.join("pages").join(format!("{i}.html")), format!("page {i}")).unwrap();
    }
    root
}

fn hashwalk_to(root: &Path, out: &Path) {
    cargo_bin_cmd!("tfws")
        .args(["hashwalk", root.to_str().unwrap(), "--out", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
}

#[test]
fn hashwalk_prints_sorted_inventory() {
    let tmp = TempDir::new().unwrap();
    let root = site(tmp.path(), 3);

    let out = cargo_bin_cmd!("tfws")
        .args(["hashwalk", root.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["count"], 3);
    assert_eq!(doc["files"][0]["path"], "pages/0.html");
    assert_eq!(doc["algo"], "sha256");
}

#[test]
fn rollback_identical_is_ok_and_shrunk_fails() {
    let tmp = TempDir::new().unwrap();
    let current = tmp.path().join("current.json");
    let shrunk = tmp.path().join("shrunk.json");
    hashwalk_to(&site(tmp.path(), 10), &current);
    hashwalk_to(&site(tmp.path(), 6), &shrunk);

    cargo_bin_cmd!("tfws")
        .args(["rollback", "--current", current.to_str().unwrap()])
        .args(["--candidate", current.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "OK mode=hard-fail cur=10 cand=10 missing=0 changed=0",
        ));

    cargo_bin_cmd!("tfws")
        .args(["rollback", "--current", current.to_str().unwrap()])
        .args(["--candidate", shrunk.to_str().unwrap()])
        .args(["--mode", "quarantine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ROLLBACK_SUSPECT mode=quarantine cur=10 cand=6 missing=4",
        ));
}

#[test]
fn rollback_rejects_unknown_mode() {
    cargo_bin_cmd!("tfws")
        .args(["rollback", "--current", "a.json", "--candidate", "b.json"])
        .args(["--mode", "lenient"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid rollback mode"));
}

#[test]
fn key_epoch_ok_and_revoked() {
    let history = sample("key-history.example.json");

    cargo_bin_cmd!("tfws")
        .args(["key-epoch", "--history", &history, "--kid", "k-2026"])
        .args(["--at", "2026-06-01T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: kid k-2026"));

    cargo_bin_cmd!("tfws")
        .args(["key-epoch", "--history", &history, "--kid", "k-leaked"])
        .args(["--at", "2026-06-01T00:00:00Z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kid_revoked"));
}

#[test]
fn validate_against_bundled_and_file_schema() {
    cargo_bin_cmd!("tfws")
        .args(["validate", "--bundled", "policy", &sample("policy.example.json")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("OK:"));

    let tmp = TempDir::new().unwrap();
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"{"min_grade_allow":"Z","min_confidence_allow":2}"#).unwrap();
    let schema = samples().join("../policy.schema.json");

    cargo_bin_cmd!("tfws")
        .args(["validate", "--schema", schema.to_str().unwrap(), bad.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed validation (2 errors)"))
        .stderr(predicate::str::contains("- /min_confidence_allow:"));
}

#[test]
fn decide_from_local_state() {
    let out = cargo_bin_cmd!("tfws")
        .args(["decide", "--policy", &sample("policy.example.json")])
        .args(["--state", &sample("trust-state.example.json")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let decision: Value = serde_json::from_slice(&out).unwrap();
    let expected: Value =
        serde_json::from_str(&fs::read_to_string(sample("decision.example.json")).unwrap())
            .unwrap();
    assert_eq!(decision, expected);
}

#[test]
fn decide_enforce_fails_on_block() {
    let tmp = TempDir::new().unwrap();
    let policy = tmp.path().join("strict.json");
    fs::write(&policy, r#"{"min_grade_allow":"A"}"#).unwrap();

    cargo_bin_cmd!("tfws")
        .args(["decide", "--enforce", "--policy", policy.to_str().unwrap()])
        .args(["--state", &sample("trust-state.example.json")])
        .assert()
        .failure()
        .stdout(predicate::str::contains("policy:grade_too_low"))
        .stderr(predicate::str::contains("block: policy:grade_too_low"));
}

#[test]
fn assess_offline_with_key_and_rollback() {
    let tmp = TempDir::new().unwrap();
    let inventory = tmp.path().join("sha256.json");
    hashwalk_to(&site(tmp.path(), 4), &inventory);

    let out = cargo_bin_cmd!("tfws")
        .args(["assess", "--domain", "example.com", "--at", "2026-06-01T00:00:00Z"])
        .args(["--key-history", &sample("key-history.example.json"), "--kid", "k-2026"])
        .args(["--inventory", inventory.to_str().unwrap()])
        .args(["--previous-inventory", inventory.to_str().unwrap()])
        .args(["--policy", &sample("policy.example.json")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&out).unwrap();
    let state = &value["trust_state"];
    assert_eq!(state["computed_at"], "2026-06-01T00:00:00Z");
    assert_eq!(state["valid_until"], "2026-06-08T00:00:00Z");
    assert_eq!(state["signals"][3]["result"], "pass");
    assert_eq!(state["signals"][4]["code"], "rollback_suspected");
    // 50 + schema 10 + key 10 + rollback 15
    assert_eq!(state["score"]["value"], 85.0);
    // well_known_present was never probed
    assert_eq!(value["decision"]["decision"], "warn");
    assert_eq!(value["decision"]["reason"], "policy:warn_on:well_known_present");
}

#[test]
fn inventory_verify_without_signature_fails() {
    let tmp = TempDir::new().unwrap();
    let inventory = tmp.path().join("sha256.json");
    hashwalk_to(&site(tmp.path(), 1), &inventory);
    let pubkey = tmp.path().join("minisign.pub");
    fs::write(&pubkey, "key").unwrap();

    cargo_bin_cmd!("tfws")
        .args(["inventory-verify", "--pubkey", pubkey.to_str().unwrap()])
        .args(["--inventory", inventory.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no_signature_found for sha256.json"));
}

#[test]
fn minisign_verify_reports_missing_pubkey() {
    let tmp = TempDir::new().unwrap();
    let message = tmp.path().join("m.json");
    fs::write(&message, "{}").unwrap();

    cargo_bin_cmd!("tfws")
        .args(["minisign-verify", "--pubkey", "/nonexistent/key.pub"])
        .args(["--message", message.to_str().unwrap(), "--sig", "/nonexistent/m.minisig"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAIL: pubkey_not_found"));
}
