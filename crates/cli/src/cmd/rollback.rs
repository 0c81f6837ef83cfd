use clap::Args;
use std::path::PathBuf;
use tfws_verifier::{load_inventory, simulate_rollback, RollbackMode};

#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Currently trusted inventory
    #[arg(long)]
    current: PathBuf,
    /// Candidate replacement inventory
    #[arg(long)]
    candidate: PathBuf,
    /// hard-fail or quarantine
    #[arg(long, default_value = "hard-fail")]
    mode: RollbackMode,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: RollbackArgs) -> anyhow::Result<()> {
    let current = load_inventory(&args.current)?;
    let candidate = load_inventory(&args.candidate)?;
    let report = simulate_rollback(&current, &candidate, args.mode);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    anyhow::ensure!(!report.is_blocking(), "{}", report);
    if !args.json {
        println!("{}", report);
    }
    Ok(())
}
