//! Detached signature discovery and verification of inventory files.
//!
//! Cryptography is delegated to a [`SignatureVerifier`]. The production
//! implementation shells out to the `minisign` binary.

use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tfws_core::{Signal, SIGNAL_INVENTORY_SIGNED, WEIGHT_INVENTORY_SIGNED};

use crate::error::{Result, VerifierError};

/// Longest diagnostic propagated from the verifier, in characters.
pub const MAX_DIAGNOSTIC_CHARS: usize = 400;

/// Default bound on a single verifier run.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_SIGNATURE_SUFFIX: &str = ".k1-provider.minisig";
const SIGNATURE_SUFFIX: &str = ".minisig";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Boolean verdict plus a diagnostic string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyOutcome {
    /// Signature is valid.
    pub ok: bool,
    /// `"ok"` on success, a reason code or tool output otherwise.
    pub diagnostic: String,
}

impl VerifyOutcome {
    /// Successful verification.
    pub fn ok() -> Self {
        Self {
            ok: true,
            diagnostic: "ok".to_string(),
        }
    }

    /// Failed verification; the diagnostic is truncated.
    pub fn failed(diagnostic: impl AsRef<str>) -> Self {
        Self {
            ok: false,
            diagnostic: truncate(diagnostic.as_ref(), MAX_DIAGNOSTIC_CHARS),
        }
    }
}

/// Verifies a detached signature over a message file.
pub trait SignatureVerifier {
    /// Check `signature` over `message` with the public key at `pubkey`.
    fn verify(&self, pubkey: &Path, message: &Path, signature: &Path) -> VerifyOutcome;
}

/// [`SignatureVerifier`] backed by the `minisign` command line tool.
#[derive(Debug, Clone)]
pub struct MinisignCli {
    program: PathBuf,
    timeout: Duration,
}

impl Default for MinisignCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("minisign"),
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}

impl MinisignCli {
    /// Use `minisign` from `PATH` with the default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a different executable with the same arguments.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Bound each run by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, pubkey: &Path, message: &Path, signature: &Path) -> io::Result<VerifyOutcome> {
        let mut child = Command::new(&self.program)
            .arg("-V")
            .arg("-p")
            .arg(pubkey)
            .arg("-m")
            .arg(message)
            .arg("-x")
            .arg(signature)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes while polling; a full pipe stalls the child.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(
                    program = %self.program.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "signature verifier timed out"
                );
                return Ok(VerifyOutcome::failed("verify_timeout"));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        if status.success() {
            return Ok(VerifyOutcome::ok());
        }

        let stderr = String::from_utf8_lossy(&stderr);
        let stdout = String::from_utf8_lossy(&stdout);
        let diagnostic = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("verify_failed");
        Ok(VerifyOutcome::failed(diagnostic))
    }
}

impl SignatureVerifier for MinisignCli {
    fn verify(&self, pubkey: &Path, message: &Path, signature: &Path) -> VerifyOutcome {
        if !pubkey.is_file() {
            return VerifyOutcome::failed("pubkey_not_found");
        }
        if !message.is_file() {
            return VerifyOutcome::failed("message_not_found");
        }
        if !signature.is_file() {
            return VerifyOutcome::failed("sig_not_found");
        }

        match self.run(pubkey, message, signature) {
            Ok(outcome) => outcome,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                VerifyOutcome::failed("minisign_not_in_path")
            }
            Err(e) => VerifyOutcome::failed(format!("verify_failed: {e}")),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Locate the detached signature for `inventory`.
///
/// Looks in `sigdir` (default: the inventory's own directory) for
/// `<name>.k1-provider.minisig`, then `<name>.minisig`.
pub fn pick_signature(inventory: &Path, sigdir: Option<&Path>) -> Result<PathBuf> {
    let name = inventory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match sigdir {
        Some(dir) => dir.to_path_buf(),
        None => match inventory.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };

    let found = [PROVIDER_SIGNATURE_SUFFIX, SIGNATURE_SUFFIX]
        .iter()
        .map(|suffix| dir.join(format!("{name}{suffix}")))
        .find(|candidate| candidate.is_file());
    match found {
        Some(path) => Ok(path),
        None => Err(VerifierError::NoSignatureFound { name, dir }),
    }
}

/// Result of [`verify_inventory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryVerification {
    /// Verifier verdict.
    pub ok: bool,
    /// Verifier diagnostic, unchanged.
    pub diagnostic: String,
    /// Signature file that was checked.
    pub signature: PathBuf,
}

impl InventoryVerification {
    /// `inventory_signed` signal: pass when verified, fail otherwise.
    pub fn to_signal(&self) -> Signal {
        let evidence = vec![
            self.signature.display().to_string(),
            self.diagnostic.clone(),
        ];
        if self.ok {
            Signal::pass(SIGNAL_INVENTORY_SIGNED, WEIGHT_INVENTORY_SIGNED, evidence)
        } else {
            Signal::fail(SIGNAL_INVENTORY_SIGNED, WEIGHT_INVENTORY_SIGNED, evidence)
        }
    }
}

/// Discover the signature for `inventory` and hand it to `verifier`.
pub fn verify_inventory(
    verifier: &dyn SignatureVerifier,
    pubkey: &Path,
    inventory: &Path,
    sigdir: Option<&Path>,
) -> Result<InventoryVerification> {
    let signature = pick_signature(inventory, sigdir)?;
    let outcome = verifier.verify(pubkey, inventory, &signature);
    tracing::info!(
        inventory = %inventory.display(),
        signature = %signature.display(),
        ok = outcome.ok,
        "inventory signature checked"
    );
    Ok(InventoryVerification {
        ok: outcome.ok,
        diagnostic: outcome.diagnostic,
        signature,
    })
}

/// `inventory_signed` failure signal for an inventory with no signature.
pub fn missing_signature_signal(err: &VerifierError) -> Signal {
    Signal::fail(
        SIGNAL_INVENTORY_SIGNED,
        WEIGHT_INVENTORY_SIGNED,
        vec![err.to_string()],
    )
}
