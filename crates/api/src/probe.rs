//! `.well-known/ai-trust-hub.json` presence probe.

use async_trait::async_trait;
use std::time::Duration;
use tfws_core::{
    Signal, SignalResult, SIGNAL_WELL_KNOWN_PRESENT, WEIGHT_WELL_KNOWN_PRESENT, WELL_KNOWN_PATH,
};

/// Outcome of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Classified result.
    pub result: SignalResult,
    /// URL, then `<METHOD> <status>` or the error.
    pub evidence: Vec<String>,
}

impl ProbeReport {
    /// `well_known_present` signal carrying this report.
    pub fn to_signal(&self) -> Signal {
        let evidence = self.evidence.clone();
        match self.result {
            SignalResult::Pass => {
                Signal::pass(SIGNAL_WELL_KNOWN_PRESENT, WEIGHT_WELL_KNOWN_PRESENT, evidence)
            }
            SignalResult::Fail => {
                Signal::fail(SIGNAL_WELL_KNOWN_PRESENT, WEIGHT_WELL_KNOWN_PRESENT, evidence)
            }
            SignalResult::Warn => {
                Signal::warn(SIGNAL_WELL_KNOWN_PRESENT, WEIGHT_WELL_KNOWN_PRESENT, evidence)
            }
            SignalResult::Unknown => {
                Signal::unknown(SIGNAL_WELL_KNOWN_PRESENT, WEIGHT_WELL_KNOWN_PRESENT, evidence)
            }
        }
    }
}

/// Checks whether a subject serves its trust hub document.
///
/// Implementations never fail: transport errors become `unknown`.
#[async_trait]
pub trait WellKnownProbe: Send + Sync {
    /// Probe `url` once.
    async fn probe(&self, url: &str) -> ProbeReport;
}

/// `<scheme>://<domain>/.well-known/ai-trust-hub.json`
pub fn well_known_url(scheme: &str, domain: &str) -> String {
    format!("{scheme}://{domain}{WELL_KNOWN_PATH}")
}

/// 200 passes, 404 fails, anything else warns.
pub fn classify_status(status: u16) -> SignalResult {
    match status {
        200 => SignalResult::Pass,
        404 => SignalResult::Fail,
        _ => SignalResult::Warn,
    }
}

/// [`WellKnownProbe`] over HTTP: `HEAD`, falling back to `GET` on 405/501.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Probe with a per-attempt timeout and no redirects.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("tfws-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn status(&self, method: reqwest::Method, url: &str) -> reqwest::Result<u16> {
        let response = self.client.request(method, url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl WellKnownProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeReport {
        let mut method = reqwest::Method::HEAD;
        let mut outcome = self.status(method.clone(), url).await;
        if matches!(outcome, Ok(405) | Ok(501)) {
            method = reqwest::Method::GET;
            outcome = self.status(method.clone(), url).await;
        }

        match outcome {
            Ok(status) => {
                tracing::debug!(url, %method, status, "well-known probe answered");
                ProbeReport {
                    result: classify_status(status),
                    evidence: vec![url.to_string(), format!("{method} {status}")],
                }
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "well-known probe failed");
                ProbeReport {
                    result: SignalResult::Unknown,
                    evidence: vec![url.to_string(), format!("{method} error: {err}")],
                }
            }
        }
    }
}
