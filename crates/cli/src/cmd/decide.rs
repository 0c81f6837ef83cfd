use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tfws_core::{Policy, TrustState};
use tfws_engine::decide;
use tfws_verifier::schema::bundled;
use tfws_verifier::validate_document;

#[derive(Debug, Args)]
pub struct DecideArgs {
    /// Policy file
    #[arg(long)]
    policy: PathBuf,
    /// Trust-state file
    #[arg(long, conflicts_with = "api", required_unless_present = "api")]
    state: Option<PathBuf>,
    /// Trust service base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, requires = "domain")]
    api: Option<String>,
    /// Domain to fetch from the trust service
    #[arg(long, requires = "api")]
    domain: Option<String>,
    /// Exit non-zero unless the decision admits the subject (allow or warn)
    #[arg(long)]
    enforce: bool,
    /// HTTP timeout for --api in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

async fn fetch_state(api: &str, domain: &str, timeout: Duration) -> anyhow::Result<serde_json::Value> {
    let url = format!("{}/api/v1/trust/domain/{}", api.trim_end_matches('/'), domain);
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to fetch {}", url))?;
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .with_context(|| format!("invalid JSON from {}", url))?;

    anyhow::ensure!(status.is_success(), "{} returned {}: {}", url, status, body);
    Ok(body)
}

pub async fn run(args: DecideArgs) -> anyhow::Result<()> {
    let policy_bytes = std::fs::read(&args.policy)
        .with_context(|| format!("failed to read {}", args.policy.display()))?;
    let policy = Policy::from_json_slice(&policy_bytes)
        .with_context(|| format!("invalid policy {}", args.policy.display()))?;

    let value: serde_json::Value = match (&args.state, &args.api, &args.domain) {
        (Some(path), _, _) => super::read_json(path)?,
        (None, Some(api), Some(domain)) => {
            fetch_state(api, domain, Duration::from_secs(args.timeout_secs)).await?
        }
        _ => anyhow::bail!("provide --state or --api with --domain"),
    };

    validate_document(&bundled::trust_state()?, &value).context("invalid trust state")?;
    let state: TrustState = serde_json::from_value(value)?;
    if !state.is_fresh_at(chrono::Utc::now()) {
        tracing::warn!(
            subject = %state.subject.id,
            valid_until = %tfws_core::format_timestamp(&state.valid_until),
            "trust state is outside its validity window"
        );
    }

    let decision = decide(&state, &policy);
    println!("{}", serde_json::to_string_pretty(&decision)?);

    if args.enforce {
        anyhow::ensure!(
            decision.is_admitted(),
            "{}: {}",
            decision.decision,
            decision.reason
        );
    }
    Ok(())
}
