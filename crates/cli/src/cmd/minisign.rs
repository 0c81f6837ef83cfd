use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tfws_verifier::{MinisignCli, SignatureVerifier};

#[derive(Debug, Args)]
pub struct MinisignVerifyArgs {
    /// Minisign public key file
    #[arg(long)]
    pubkey: PathBuf,
    /// Signed file
    #[arg(long)]
    message: PathBuf,
    /// Detached signature file
    #[arg(long)]
    sig: PathBuf,
    /// minisign executable
    #[arg(long, default_value = "minisign")]
    minisign: PathBuf,
    /// Give up after this many seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

pub fn run(args: MinisignVerifyArgs) -> anyhow::Result<()> {
    let verifier = MinisignCli::new()
        .with_program(&args.minisign)
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let outcome = verifier.verify(&args.pubkey, &args.message, &args.sig);

    anyhow::ensure!(outcome.ok, "FAIL: {}", outcome.diagnostic);
    println!("OK: {} verified", args.message.display());
    Ok(())
}
