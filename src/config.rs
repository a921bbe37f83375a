//! Configuration loading and validation
//!
//! Secrets come from the environment (`PERSONIO_CLIENT_ID`,
//! `PERSONIO_CLIENT_SECRET`, optional `PERSONIO_BASE_URL` and
//! `EXPORT_OUTPUT_PATH`); everything else comes from an optional YAML file.
//! The result is validated before the core starts and treated as immutable
//! for the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Configuration errors, all fatal before a run starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is unset or empty
    #[error("missing mandatory environment variable: {0}")]
    MissingEnv(&'static str),

    /// Config file exists but could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the unreadable file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected schema
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Values parsed but fail validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Personio API credentials and endpoint.
#[derive(Debug, Clone)]
pub struct PersonioConfig {
    /// OAuth-style client id
    pub client_id: String,
    /// OAuth-style client secret
    pub client_secret: String,
    /// API base URL
    pub base_url: String,
}

/// Export artifact settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Directory the CSV artifacts and document tree are written to
    pub output_path: PathBuf,
    /// Whether to download employee documents after the CSVs are written
    pub include_documents: bool,
    /// Bound on concurrent document downloads
    pub document_concurrency: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./output"),
            include_documents: true,
            document_concurrency: 4,
        }
    }
}

/// HTTP client behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,
    /// Bound on physical attempts per call
    pub retry_max_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_max_attempts: 5,
        }
    }
}

impl HttpConfig {
    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Interval settings for the `schedule` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Minutes between the end of one run and the start of the next
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 24 * 60,
        }
    }
}

/// Health endpoint settings for scheduled deployments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    /// Whether the health endpoint is served in `schedule` mode
    pub enabled: bool,
    /// Listen port
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

/// Log verbosity settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default tracing level (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete, validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API credentials and endpoint
    pub personio: PersonioConfig,
    /// Export artifact settings
    pub export: ExportConfig,
    /// HTTP client behavior
    pub http: HttpConfig,
    /// Interval settings for scheduled runs
    pub schedule: ScheduleConfig,
    /// Health endpoint settings
    pub health: HealthConfig,
    /// Log verbosity
    pub logging: LoggingConfig,
}

/// YAML file schema: every section optional, defaults applied per section.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    export: ExportConfig,
    http: HttpConfig,
    schedule: ScheduleConfig,
    health: HealthConfig,
    logging: LoggingConfig,
}

const DEFAULT_BASE_URL: &str = "https://api.personio.de";

/// Load configuration from environment variables and an optional YAML file.
///
/// A missing file falls back to defaults; a present-but-broken file is an
/// error rather than a silent fallback.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let client_id = required_env("PERSONIO_CLIENT_ID")?;
    let client_secret = required_env("PERSONIO_CLIENT_SECRET")?;
    let base_url = optional_env("PERSONIO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let file = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str::<FileConfig>(&content)?
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        FileConfig::default()
    };

    let mut export = file.export;
    if let Some(output_path) = optional_env("EXPORT_OUTPUT_PATH") {
        export.output_path = PathBuf::from(output_path);
    }

    let config = AppConfig {
        personio: PersonioConfig {
            client_id,
            client_secret,
            base_url,
        },
        export,
        http: file.http,
        schedule: file.schedule,
        health: file.health,
        logging: file.logging,
    };
    validate(&config)?;
    Ok(config)
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.personio.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("base_url must not be empty".into()));
    }
    if config.export.output_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("output_path must not be empty".into()));
    }
    if config.export.document_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "document_concurrency must be at least 1".into(),
        ));
    }
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
    }
    if config.http.retry_max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "retry_max_attempts must be at least 1".into(),
        ));
    }
    if config.schedule.interval_minutes == 0 {
        return Err(ConfigError::Invalid(
            "interval_minutes must be at least 1".into(),
        ));
    }
    Ok(())
}
