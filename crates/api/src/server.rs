use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tfws_core::{Subject, TrustState, MAX_VALIDITY_DAYS};
use tfws_engine::{baseline_signals, fold_signal, Assessor, ScoringTable};
use tfws_verifier::schema::{bundled, violations};
use tfws_verifier::SchemaViolation;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::probe::{well_known_url, HttpProbe, WellKnownProbe};

/// Most schema violations returned in a 500 response.
pub const MAX_SERVICE_VIOLATIONS: usize = 10;

const MIN_DOMAIN_LEN: usize = 3;

#[derive(Clone)]
struct AppState {
    probe: Option<Arc<dyn WellKnownProbe>>,
    probe_scheme: String,
    assessor: Arc<Assessor>,
    trust_state_schema: Arc<serde_json::Value>,
}

/// Runtime configuration for the TFWS trust service.
#[derive(Debug, Clone)]
pub struct ApiRuntimeConfig {
    bind: String,
    port: u16,
    probe_enabled: bool,
    probe_timeout: Duration,
    probe_scheme: String,
    scoring: ScoringTable,
    validity_days: i64,
}

impl ApiRuntimeConfig {
    /// Runtime configuration from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind: config.server.bind.clone(),
            port: config.server.port,
            probe_enabled: config.probe.enabled,
            probe_timeout: Duration::from_millis(config.probe.timeout_ms),
            probe_scheme: config.probe.scheme.clone(),
            scoring: config.scoring.clone(),
            validity_days: config.trust.validity_days,
        }
    }

    /// Deterministic test configuration: ephemeral port, probing disabled.
    pub fn for_test() -> Self {
        let mut config = Config::default();
        config.server.bind = "127.0.0.1".to_string();
        config.server.port = 0;
        config.probe.enabled = false;
        Self::from_config(&config)
    }

    fn assessor(&self) -> Assessor {
        let days = self.validity_days.clamp(1, MAX_VALIDITY_DAYS);
        Assessor::new(self.scoring.clone(), chrono::Duration::days(days))
    }
}

fn build_state(
    config: &ApiRuntimeConfig,
    probe: Option<Arc<dyn WellKnownProbe>>,
) -> anyhow::Result<AppState> {
    let trust_state_schema =
        bundled::trust_state().context("Failed to load bundled trust-state schema")?;

    Ok(AppState {
        probe,
        probe_scheme: config.probe_scheme.clone(),
        assessor: Arc::new(config.assessor()),
        trust_state_schema: Arc::new(trust_state_schema),
    })
}

fn default_probe(config: &ApiRuntimeConfig) -> anyhow::Result<Option<Arc<dyn WellKnownProbe>>> {
    if !config.probe_enabled {
        return Ok(None);
    }
    let probe = HttpProbe::new(config.probe_timeout).context("Failed to build HTTP probe")?;
    Ok(Some(Arc::new(probe)))
}

fn router_for_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/trust/domain/:domain", get(get_domain_trust))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build an in-process router from explicit runtime config.
pub fn build_app(config: &ApiRuntimeConfig) -> anyhow::Result<Router> {
    let probe = default_probe(config)?;
    Ok(router_for_state(build_state(config, probe)?))
}

/// Build an in-process router that probes subjects with `probe`.
pub fn build_app_with_probe(
    config: &ApiRuntimeConfig,
    probe: Arc<dyn WellKnownProbe>,
) -> anyhow::Result<Router> {
    Ok(router_for_state(build_state(config, Some(probe))?))
}

/// Run the service with explicit runtime configuration.
pub async fn run_with_config(config: ApiRuntimeConfig) -> anyhow::Result<()> {
    let app = build_app(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.bind, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "TFWS trust service listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("TFWS trust service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn health() -> &'static str {
    "OK"
}

const ERROR_CODE_INVALID_REQUEST: &str = "invalid_request";
const ERROR_CODE_INTERNAL_ERROR: &str = "internal_error";

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorInfo {
                code,
                message: message.into(),
                details,
            },
        }),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, ERROR_CODE_INVALID_REQUEST, msg, None)
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ERROR_CODE_INTERNAL_ERROR,
        format!("Internal error: {}", err),
        None,
    )
}

fn schema_failure(found: &[SchemaViolation]) -> ApiError {
    let shown: Vec<&SchemaViolation> = found.iter().take(MAX_SERVICE_VIOLATIONS).collect();
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ERROR_CODE_INTERNAL_ERROR,
        format!(
            "Computed trust state failed schema validation ({} violations)",
            found.len()
        ),
        Some(serde_json::json!({ "violations": shown })),
    )
}

/// Subject identifiers: at least 3 characters, a dot, hostname characters only.
fn validate_domain(domain: &str) -> Result<(), String> {
    if domain.len() < MIN_DOMAIN_LEN {
        return Err(format!(
            "domain must be at least {} characters",
            MIN_DOMAIN_LEN
        ));
    }
    if !domain.contains('.') {
        return Err("domain must contain a '.'".to_string());
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err("domain contains characters outside [a-z0-9.-]".to_string());
    }
    Ok(())
}

async fn get_domain_trust(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<TrustState>, ApiError> {
    let domain = domain.trim().to_ascii_lowercase();
    validate_domain(&domain).map_err(bad_request)?;

    let mut signals = baseline_signals();
    if let Some(probe) = &state.probe {
        let url = well_known_url(&state.probe_scheme, &domain);
        fold_signal(&mut signals, probe.probe(&url).await.to_signal());
    }

    let trust = state
        .assessor
        .assess(Subject::domain(domain.as_str()), signals, Utc::now());

    let value = serde_json::to_value(&trust).map_err(internal_error)?;
    let found = violations(&state.trust_state_schema, &value).map_err(internal_error)?;
    if !found.is_empty() {
        warn!(domain = %domain, violations = found.len(), "trust state failed schema validation");
        return Err(schema_failure(&found));
    }

    info!(
        domain = %domain,
        score = trust.score.value,
        grade = trust.score.grade.as_str(),
        "trust state computed"
    );
    Ok(Json(trust))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeReport;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tfws_core::SignalResult;
    use tower::ServiceExt;

    struct StaticProbe {
        result: SignalResult,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl WellKnownProbe for StaticProbe {
        async fn probe(&self, url: &str) -> ProbeReport {
            self.urls.lock().unwrap().push(url.to_string());
            ProbeReport {
                result: self.result,
                evidence: vec![url.to_string(), "HEAD test".to_string()],
            }
        }
    }

    fn test_state(probe: Option<Arc<dyn WellKnownProbe>>) -> AppState {
        build_state(&ApiRuntimeConfig::for_test(), probe).unwrap()
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router_for_state(test_state(None));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("a.b").is_ok());
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("ab").is_err());
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain("evil.com@attacker").is_err());
        assert!(validate_domain("example.com/admin").is_err());
        assert!(validate_domain("xn--bcher-kva.example").is_ok());
        assert!(validate_domain("bücher.example").is_err());
    }

    #[tokio::test]
    async fn test_probe_result_is_folded_and_scored() {
        let probe = Arc::new(StaticProbe {
            result: SignalResult::Pass,
            urls: Mutex::new(Vec::new()),
        });
        let app = router_for_state(test_state(Some(probe.clone() as Arc<dyn WellKnownProbe>)));

        let (status, body) = get_json(app, "/api/v1/trust/domain/Example.COM").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"]["id"], "example.com");
        assert_eq!(body["signals"][1]["code"], "well_known_present");
        assert_eq!(body["signals"][1]["result"], "pass");
        assert_eq!(body["score"]["value"], 70.0);
        assert_eq!(body["score"]["grade"], "C");
        assert_eq!(
            probe.urls.lock().unwrap().as_slice(),
            ["https://example.com/.well-known/ai-trust-hub.json"]
        );
    }

    #[tokio::test]
    async fn test_missing_well_known_lowers_score() {
        let probe = Arc::new(StaticProbe {
            result: SignalResult::Fail,
            urls: Mutex::new(Vec::new()),
        });
        let app = router_for_state(test_state(Some(probe as Arc<dyn WellKnownProbe>)));

        let (status, body) = get_json(app, "/api/v1/trust/domain/example.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"]["value"], 50.0);
        assert_eq!(body["score"]["grade"], "E");
    }

    #[tokio::test]
    async fn test_rejects_short_domain() {
        let app = router_for_state(test_state(None));
        let (status, body) = get_json(app, "/api/v1/trust/domain/ab").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_schema_failure_is_500_with_capped_details() {
        let mut state = test_state(None);
        state.trust_state_schema = Arc::new(serde_json::json!({
            "type": "object",
            "properties": {
                "score": {
                    "type": "object",
                    "properties": { "value": { "minimum": 99 } }
                },
                "signals": {
                    "type": "array",
                    "items": { "properties": { "weight": { "maximum": 1 } } }
                }
            }
        }));
        let app = router_for_state(state);

        let (status, body) = get_json(app, "/api/v1/trust/domain/example.com").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        let shown = body["error"]["details"]["violations"].as_array().unwrap();
        assert_eq!(shown.len(), 5);
        assert_eq!(shown[0]["path"], "/score/value");
    }

    #[tokio::test]
    async fn test_schema_failure_shows_first_ten_of_many() {
        let mut state = test_state(None);
        state.trust_state_schema = Arc::new(serde_json::json!({
            "type": "object",
            "properties": {
                "score": {
                    "type": "object",
                    "properties": { "value": { "minimum": 99 } }
                },
                "signals": {
                    "type": "array",
                    "items": {
                        "properties": {
                            "code": { "maxLength": 1 },
                            "result": { "maxLength": 1 },
                            "weight": { "maximum": 1 }
                        }
                    }
                }
            }
        }));
        let app = router_for_state(state);

        let (status, body) = get_json(app, "/api/v1/trust/domain/example.com").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("(13 violations)"), "{message}");
        let shown = body["error"]["details"]["violations"].as_array().unwrap();
        assert_eq!(shown.len(), MAX_SERVICE_VIOLATIONS);
        assert_eq!(shown[0]["path"], "/score/value");
        assert_eq!(shown[1]["path"], "/signals/0/code");
    }
}
