use clap::Args;
use std::path::PathBuf;
use tfws_core::format_timestamp;
use tfws_verifier::{check_key_epoch, load_key_history};

#[derive(Debug, Args)]
pub struct KeyEpochArgs {
    /// Key history file
    #[arg(long)]
    history: PathBuf,
    /// Key identifier
    #[arg(long)]
    kid: String,
    /// Instant to check (RFC 3339, defaults to now)
    #[arg(long)]
    at: Option<String>,
}

pub fn run(args: KeyEpochArgs) -> anyhow::Result<()> {
    let history = load_key_history(&args.history)?;
    let at = super::parse_at(args.at.as_deref())?;
    let check = check_key_epoch(&history, &args.kid, at);

    anyhow::ensure!(
        check.ok,
        "FAIL: kid {} at {}: {}",
        check.kid,
        format_timestamp(&at),
        check.reason
    );
    println!("OK: kid {} valid at {}", check.kid, format_timestamp(&at));
    Ok(())
}
