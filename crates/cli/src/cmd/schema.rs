use clap::Args;
use std::path::PathBuf;
use tfws_verifier::schema::{bundled, load_json};
use tfws_verifier::{format_violations, validate_document, VerifierError, MAX_REPORTED_VIOLATIONS};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Schema file
    #[arg(long, conflicts_with = "bundled", required_unless_present = "bundled")]
    schema: Option<PathBuf>,
    /// Bundled schema name (trust-state, key-history, inventory, policy, decision)
    #[arg(long)]
    bundled: Option<String>,
    /// JSON document to validate
    json: PathBuf,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let (schema, schema_label) = match (&args.schema, &args.bundled) {
        (Some(path), _) => (load_json(path)?, path.display().to_string()),
        (None, Some(name)) => (bundled::by_name(name)?, format!("bundled:{name}")),
        (None, None) => anyhow::bail!("provide --schema or --bundled"),
    };
    let instance = load_json(&args.json)?;

    match validate_document(&schema, &instance) {
        Ok(()) => {
            println!("OK: {} is valid against {}", args.json.display(), schema_label);
            Ok(())
        }
        Err(VerifierError::SchemaViolations(found)) => anyhow::bail!(
            "{} failed validation ({} errors):\n{}",
            args.json.display(),
            found.len(),
            format_violations(&found, MAX_REPORTED_VIOLATIONS)
        ),
        Err(e) => Err(e.into()),
    }
}
