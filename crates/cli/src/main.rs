use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

#[derive(Debug, Parser)]
#[command(name = "tfws")]
#[command(version, about = "TFWS trust decision and integrity verification CLI")]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a JSON document against a JSON Schema (draft 2020-12).
    Validate(cmd::schema::ValidateArgs),
    /// Hash a directory tree into a sorted SHA-256 inventory.
    Hashwalk(cmd::inventory::HashwalkArgs),
    /// Verify a detached minisign signature.
    MinisignVerify(cmd::minisign::MinisignVerifyArgs),
    /// Discover and verify the signature of an inventory file.
    InventoryVerify(cmd::inventory::InventoryVerifyArgs),
    /// Check a key identifier against a key history.
    KeyEpoch(cmd::key_epoch::KeyEpochArgs),
    /// Compare a candidate inventory with the current one for rollback.
    Rollback(cmd::rollback::RollbackArgs),
    /// Apply a policy to a trust state (local file or fetched from the service).
    Decide(cmd::decide::DecideArgs),
    /// Build a trust state offline from local checks.
    Assess(cmd::assess::AssessArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    match cli.command {
        Command::Validate(args) => cmd::schema::run(args)?,
        Command::Hashwalk(args) => cmd::inventory::run_hashwalk(args)?,
        Command::MinisignVerify(args) => cmd::minisign::run(args)?,
        Command::InventoryVerify(args) => cmd::inventory::run_verify(args)?,
        Command::KeyEpoch(args) => cmd::key_epoch::run(args)?,
        Command::Rollback(args) => cmd::rollback::run(args)?,
        Command::Decide(args) => cmd::decide::run(args).await?,
        Command::Assess(args) => cmd::assess::run(args).await?,
    }

    Ok(())
}

fn init_logging(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("tfws=debug,tfws_verifier=debug,tfws_api=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init();
}
