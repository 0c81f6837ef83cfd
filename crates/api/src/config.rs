//! Configuration for the TFWS trust service.
//!
//! Loaded from, in increasing precedence:
//! - default values
//! - a TOML file (`${VAR_NAME}` placeholders are expanded)
//! - `TFWS_*` environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tfws_core::{DEFAULT_VALIDITY_DAYS, MAX_VALIDITY_DAYS};
use tfws_engine::ScoringTable;

/// Main configuration for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// `.well-known` probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Trust-state assembly
    #[serde(default)]
    pub trust: TrustConfig,

    /// Scoring table override
    #[serde(default)]
    pub scoring: ScoringTable,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe subjects at all; when false `well_known_present` stays `unknown`
    #[serde(default = "default_probe_enabled")]
    pub enabled: bool,

    /// Single-attempt timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,

    /// URL scheme used to reach the subject
    #[serde(default = "default_probe_scheme")]
    pub scheme: String,
}

/// Trust-state assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Days a computed trust state stays valid
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_probe_enabled() -> bool {
    true
}

fn default_probe_timeout_ms() -> u64 {
    2500
}

fn default_probe_scheme() -> String {
    "https".to_string()
}

fn default_validity_days() -> i64 {
    DEFAULT_VALIDITY_DAYS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: default_probe_enabled(),
            timeout_ms: default_probe_timeout_ms(),
            scheme: default_probe_scheme(),
        }
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax,
    /// e.g. `bind = "${TFWS_LISTEN_ADDR}"`.
    ///
    /// ```no_run
    /// # use tfws_api::config::Config;
    /// let config = Config::from_file("tfws.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// File (if any) plus environment overrides, validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TFWS_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(bind) = parse_env_string("TFWS_BIND")? {
            self.server.bind = bind;
        }
        if let Some(port) = parse_env_u64("TFWS_PORT")? {
            self.server.port =
                u16::try_from(port).context("Invalid TFWS_PORT (expected 0..=65535)")?;
        }
        if let Some(timeout_ms) = parse_env_u64("TFWS_PROBE_TIMEOUT_MS")? {
            self.probe.timeout_ms = timeout_ms;
        }
        if let Some(enabled) = parse_env_bool("TFWS_PROBE_ENABLED")? {
            self.probe.enabled = enabled;
        }
        if let Some(days) = parse_env_u64("TFWS_VALIDITY_DAYS")? {
            self.trust.validity_days =
                i64::try_from(days).context("Invalid TFWS_VALIDITY_DAYS (too large)")?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("Server bind address cannot be empty");
        }

        if self.probe.timeout_ms == 0 {
            anyhow::bail!("Probe timeout_ms must be > 0");
        }
        if !matches!(self.probe.scheme.as_str(), "http" | "https") {
            anyhow::bail!(
                "Probe scheme must be http or https (got '{}')",
                self.probe.scheme
            );
        }

        if !(1..=MAX_VALIDITY_DAYS).contains(&self.trust.validity_days) {
            anyhow::bail!(
                "Trust validity_days must be between 1 and {} (got {})",
                MAX_VALIDITY_DAYS,
                self.trust.validity_days
            );
        }

        self.scoring
            .validate()
            .context("Invalid [scoring] table")?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }
}

/// Replace `${VAR_NAME}` placeholders with environment values.
///
/// Text after a `#` that is outside a quoted string is a comment and is
/// copied untouched. A referenced variable that is not set is an error.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    for (line_no, line) in input.split_inclusive('\n').enumerate() {
        let (body, comment) = split_comment(line);
        let mut rest = body;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').with_context(|| {
                format!(
                    "Unclosed environment variable placeholder on line {}",
                    line_no + 1
                )
            })?;
            let name = &after[..end];
            if name.is_empty() {
                anyhow::bail!("Empty environment variable name on line {}", line_no + 1);
            }
            let value = std::env::var(name)
                .with_context(|| format!("Environment variable {} is not set", name))?;
            out.push_str(&value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out.push_str(comment);
    }
    Ok(out)
}

fn split_comment(line: &str) -> (&str, &str) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '#' => return line.split_at(idx),
            None => {}
        }
    }
    (line, "")
}

fn parse_env_string(name: &str) -> Result<Option<String>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    let raw = raw.trim();
    anyhow::ensure!(!raw.is_empty(), "{} is set but empty", name);
    Ok(Some(raw.to_string()))
}

fn parse_env_u64(name: &str) -> Result<Option<u64>> {
    let Some(raw) = parse_env_string(name)? else {
        return Ok(None);
    };
    let v: u64 = raw
        .parse()
        .with_context(|| format!("Invalid {} (expected u64)", name))?;
    Ok(Some(v))
}

fn parse_env_bool(name: &str) -> Result<Option<bool>> {
    let Some(raw) = parse_env_string(name)? else {
        return Ok(None);
    };
    let value = match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => true,
        "0" | "false" | "no" | "n" | "off" => false,
        _ => anyhow::bail!("Invalid {} (expected boolean-like value)", name),
    };
    Ok(Some(value))
}
