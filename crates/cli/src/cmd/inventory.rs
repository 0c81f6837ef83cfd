use clap::Args;
use std::path::PathBuf;
use tfws_verifier::{hashwalk, verify_inventory, write_inventory, MinisignCli};

#[derive(Debug, Args)]
pub struct HashwalkArgs {
    /// Directory to hash
    root: PathBuf,
    /// Output file (defaults to stdout)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InventoryVerifyArgs {
    /// Minisign public key file
    #[arg(long)]
    pubkey: PathBuf,
    /// Inventory file (e.g. sha256.json)
    #[arg(long)]
    inventory: PathBuf,
    /// Directory holding the signature (defaults to the inventory's directory)
    #[arg(long)]
    sigdir: Option<PathBuf>,
    /// minisign executable
    #[arg(long, default_value = "minisign")]
    minisign: PathBuf,
}

pub fn run_hashwalk(args: HashwalkArgs) -> anyhow::Result<()> {
    let doc = hashwalk(&args.root)?;

    match args.out {
        Some(out) => {
            write_inventory(&doc, &out)?;
            println!("Wrote {} ({} files)", out.display(), doc.count);
        }
        None => println!("{}", doc.to_json_pretty()?),
    }

    Ok(())
}

pub fn run_verify(args: InventoryVerifyArgs) -> anyhow::Result<()> {
    let verifier = MinisignCli::new().with_program(&args.minisign);
    let result = verify_inventory(
        &verifier,
        &args.pubkey,
        &args.inventory,
        args.sigdir.as_deref(),
    )?;

    anyhow::ensure!(
        result.ok,
        "FAIL: {} ({}): {}",
        args.inventory.display(),
        result.signature.display(),
        result.diagnostic
    );
    println!(
        "OK: {} signed ({})",
        args.inventory.display(),
        result.signature.display()
    );
    Ok(())
}
