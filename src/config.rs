use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_FAST_QUERY_TIMEOUT_MS: u64 = 1_500;

/// What deleting an element type does to the rows it owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove only the type row; hierarchy, BOM and drawings stay behind.
    KeepChildren,
    /// Remove hierarchy, BOM and drawing rows and tombstone the elements.
    /// Revision tables are never touched.
    Cascade,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        DeletePolicy::KeepChildren
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Deadline for ordinary queries and whole write transactions (milliseconds)
    #[serde(default = "default_query_timeout_ms")]
    #[validate(range(min = 1))]
    pub query_timeout_default_ms: u64,

    /// Deadline for point lookups such as session resolution (milliseconds)
    #[serde(default = "default_fast_query_timeout_ms")]
    #[validate(range(min = 1))]
    pub query_timeout_fast_ms: u64,

    /// Capacity of the post-commit activity channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Sessions older than this are rejected even without an explicit expiry
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Mail relay settings. Only handed to the mail collaborator.
    #[serde(default)]
    pub mail_host: Option<String>,
    #[serde(default)]
    pub mail_user: Option<String>,
    #[serde(default)]
    pub mail_password: Option<String>,

    /// Cascade behaviour of element type deletion
    #[serde(default)]
    pub element_type_delete_policy: DeletePolicy,

    /// Skip the BOM snapshot when the update carries an identical BOM
    #[serde(default)]
    pub dedupe_bom_snapshots: bool,
}

/// The two deadline tiers attached to database work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryDeadlines {
    pub default: Duration,
    pub fast: Duration,
}

impl Default for QueryDeadlines {
    fn default() -> Self {
        Self {
            default: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            fast: Duration::from_millis(DEFAULT_FAST_QUERY_TIMEOUT_MS),
        }
    }
}

impl From<&AppConfig> for QueryDeadlines {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            default: Duration::from_millis(cfg.query_timeout_default_ms),
            fast: Duration::from_millis(cfg.query_timeout_fast_ms),
        }
    }
}

/// Engine-level switches that resolve behaviour left open by the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub delete_policy: DeletePolicy,
    pub dedupe_bom_snapshots: bool,
}

impl From<&AppConfig> for EngineOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            delete_policy: cfg.element_type_delete_policy,
            dedupe_bom_snapshots: cfg.dedupe_bom_snapshots,
        }
    }
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            query_timeout_default_ms: default_query_timeout_ms(),
            query_timeout_fast_ms: default_fast_query_timeout_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            session_ttl_secs: default_session_ttl_secs(),
            mail_host: None,
            mail_user: None,
            mail_password: None,
            element_type_delete_policy: DeletePolicy::default(),
            dedupe_bom_snapshots: false,
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn deadlines(&self) -> QueryDeadlines {
        self.into()
    }

    pub fn engine_options(&self) -> EngineOptions {
        self.into()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.query_timeout_fast_ms > self.query_timeout_default_ms {
            let mut err = ValidationError::new("query_timeout_fast_ms");
            err.message =
                Some("query_timeout_fast_ms must not exceed query_timeout_default_ms".into());
            errors.add("query_timeout_fast_ms", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

fn default_fast_query_timeout_ms() -> u64 {
    DEFAULT_FAST_QUERY_TIMEOUT_MS
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_session_ttl_secs() -> u64 {
    12 * 60 * 60
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("precast_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "postgres://localhost/precast")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn fast_tier_may_not_exceed_default_tier() {
        let mut cfg = base_config();
        cfg.query_timeout_fast_ms = cfg.query_timeout_default_ms + 1;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn deadlines_are_derived_from_config() {
        let mut cfg = base_config();
        cfg.query_timeout_default_ms = 4_000;
        cfg.query_timeout_fast_ms = 250;
        let deadlines = cfg.deadlines();
        assert_eq!(deadlines.default, Duration::from_millis(4_000));
        assert_eq!(deadlines.fast, Duration::from_millis(250));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn delete_policy_parses_from_snake_case() {
        assert_eq!(
            DeletePolicy::from_str("cascade").unwrap(),
            DeletePolicy::Cascade
        );
        assert_eq!(DeletePolicy::default(), DeletePolicy::KeepChildren);
        assert_eq!(DeletePolicy::KeepChildren.to_string(), "keep_children");
    }
}
