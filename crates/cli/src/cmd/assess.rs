use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tfws_api::probe::{well_known_url, HttpProbe, WellKnownProbe};
use tfws_core::{Policy, Subject};
use tfws_engine::{assess, baseline_signals, decide, fold_signal};
use tfws_verifier::schema::bundled;
use tfws_verifier::{
    check_key_epoch, load_inventory, load_key_history, missing_signature_signal,
    simulate_rollback, validate_document, verify_inventory, MinisignCli, RollbackMode,
    VerifierError,
};

#[derive(Debug, Args)]
pub struct AssessArgs {
    /// Subject domain
    #[arg(long)]
    domain: String,
    /// Probe the domain's .well-known trust hub document
    #[arg(long)]
    probe: bool,
    /// Scheme used for the probe
    #[arg(long, default_value = "https")]
    scheme: String,
    /// Probe timeout in milliseconds
    #[arg(long, default_value_t = 2500)]
    probe_timeout_ms: u64,
    /// Published inventory (signature check with --pubkey, rollback check with --previous-inventory)
    #[arg(long)]
    inventory: Option<PathBuf>,
    /// Minisign public key for the inventory signature
    #[arg(long, requires = "inventory")]
    pubkey: Option<PathBuf>,
    /// Directory holding the inventory signature
    #[arg(long)]
    sigdir: Option<PathBuf>,
    /// minisign executable
    #[arg(long, default_value = "minisign")]
    minisign: PathBuf,
    /// Previously trusted inventory to compare against
    #[arg(long, requires = "inventory")]
    previous_inventory: Option<PathBuf>,
    /// Rollback mode recorded in the report
    #[arg(long, default_value = "hard-fail")]
    rollback_mode: RollbackMode,
    /// Key history file
    #[arg(long, requires = "kid")]
    key_history: Option<PathBuf>,
    /// Signing key identifier to check
    #[arg(long, requires = "key_history")]
    kid: Option<String>,
    /// Evaluation instant (RFC 3339, defaults to now)
    #[arg(long)]
    at: Option<String>,
    /// Also decide with this policy
    #[arg(long)]
    policy: Option<PathBuf>,
    /// Output file (defaults to stdout)
    #[arg(long)]
    out: Option<PathBuf>,
}

pub async fn run(args: AssessArgs) -> anyhow::Result<()> {
    let at = super::parse_at(args.at.as_deref())?;
    let mut signals = baseline_signals();

    if args.probe {
        let probe = HttpProbe::new(Duration::from_millis(args.probe_timeout_ms))?;
        let report = probe
            .probe(&well_known_url(&args.scheme, &args.domain))
            .await;
        fold_signal(&mut signals, report.to_signal());
    }

    if let (Some(inventory), Some(pubkey)) = (&args.inventory, &args.pubkey) {
        let verifier = MinisignCli::new().with_program(&args.minisign);
        let signal = match verify_inventory(&verifier, pubkey, inventory, args.sigdir.as_deref()) {
            Ok(result) => result.to_signal(),
            Err(err @ VerifierError::NoSignatureFound { .. }) => missing_signature_signal(&err),
            Err(err) => return Err(err.into()),
        };
        fold_signal(&mut signals, signal);
    }

    if let (Some(history), Some(kid)) = (&args.key_history, &args.kid) {
        let history = load_key_history(history)?;
        fold_signal(&mut signals, check_key_epoch(&history, kid, at).to_signal());
    }

    if let (Some(candidate), Some(previous)) = (&args.inventory, &args.previous_inventory) {
        let report = simulate_rollback(
            &load_inventory(previous)?,
            &load_inventory(candidate)?,
            args.rollback_mode,
        );
        fold_signal(&mut signals, report.to_signal());
    }

    let state = assess(Subject::domain(args.domain.as_str()), signals, at);
    let state_value = serde_json::to_value(&state)?;
    validate_document(&bundled::trust_state()?, &state_value)
        .context("computed trust state failed schema validation")?;

    let output = match &args.policy {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let policy = Policy::from_json_slice(&bytes)
                .with_context(|| format!("invalid policy {}", path.display()))?;
            serde_json::json!({
                "trust_state": state_value,
                "decision": decide(&state, &policy),
            })
        }
        None => state_value,
    };

    let json = serde_json::to_string_pretty(&output)?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} (score {} grade {})",
                path.display(),
                state.score.value,
                state.score.grade.as_str()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
