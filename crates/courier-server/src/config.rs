//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound webhook settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "courier_delivery=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Upper bound on a single delivery attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum deliveries in flight across all dispatches.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// `User-Agent` header sent to subscribers.
    #[serde(default = "courier_delivery::default_user_agent")]
    pub user_agent: String,
}

impl DeliveryConfig {
    /// The per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "courier.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    courier_types::DEFAULT_DELIVERY_TIMEOUT.as_millis() as u64
}

fn default_max_concurrency() -> usize {
    courier_delivery::DEFAULT_MAX_CONCURRENCY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            user_agent: courier_delivery::default_user_agent(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `COURIER_HOST` overrides `server.host`
/// - `COURIER_PORT` overrides `server.port`
/// - `COURIER_DB_PATH` overrides `database.path`
/// - `COURIER_LOG_LEVEL` overrides `logging.level`
/// - `COURIER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `COURIER_DELIVERY_TIMEOUT_MS` overrides `delivery.timeout_ms`
/// - `COURIER_DELIVERY_MAX_CONCURRENCY` overrides `delivery.max_concurrency`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    enforce_minimums(&mut config);
    Ok(config)
}

/// Replaces values that would make the service unusable.
///
/// A zero delivery timeout fails every attempt immediately, so it falls
/// back to the default. A zero concurrency bound is raised to one.
fn enforce_minimums(config: &mut Config) {
    if config.delivery.timeout_ms == 0 {
        tracing::warn!(
            default_ms = default_timeout_ms(),
            "delivery.timeout_ms must be positive, using default"
        );
        config.delivery.timeout_ms = default_timeout_ms();
    }
    if config.delivery.max_concurrency == 0 {
        tracing::warn!("delivery.max_concurrency must be positive, using 1");
        config.delivery.max_concurrency = 1;
    }
}

/// Applies overrides from `lookup`. Unparseable values are ignored.
fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = lookup("COURIER_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = lookup("COURIER_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(db_path) = lookup("COURIER_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("COURIER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("COURIER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(parsed) = lookup("COURIER_DELIVERY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.delivery.timeout_ms = parsed;
    }
    if let Some(parsed) =
        lookup("COURIER_DELIVERY_MAX_CONCURRENCY").and_then(|v| v.parse().ok())
    {
        config.delivery.max_concurrency = parsed;
    }
}
