//! Configuration management for CaseForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - `SUPABASE_URL` / `SUPABASE_ANON_KEY` for the storage endpoint
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use crate::record::DEFAULT_COLUMNS;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Storage URL that selects the in-process store
pub const MEMORY_STORAGE_URL: &str = "memory://";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Hosted table configuration
    pub storage: StorageConfig,

    /// Search page configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Project URL of the hosted database, or `memory://`
    pub url: String,

    /// Anonymous API key
    #[serde(default)]
    pub api_key: String,

    /// Table holding the case records
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,

    /// Rows fetched per request when scanning the whole table
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Rows per result page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// UTC offset appended to date filter bounds
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: String,

    /// Columns shown in the result table
    #[serde(default = "default_display_columns")]
    pub display_columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<String>,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Service name attached to logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 30 }
fn default_table() -> String { crate::DEFAULT_TABLE.to_string() }
fn default_storage_timeout() -> u64 { 15 }
fn default_batch_size() -> usize { 1000 }
fn default_page_size() -> usize { crate::DEFAULT_PAGE_SIZE }
fn default_timezone_offset() -> String { "+08:00".to_string() }
fn default_display_columns() -> Vec<String> { DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect() }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_enabled() -> bool { true }
fn default_service_name() -> String { "caseforge".to_string() }

impl StorageConfig {
    /// Per-request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            timezone_offset: default_timezone_offset(),
            display_columns: default_display_columns(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            log_file: None,
            metrics_enabled: default_metrics_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and the `config/` directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// Load configuration from environment and files under `config_dir`
    pub fn load_from(config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let file = |name: &str| {
            File::with_name(&config_dir.join(name).to_string_lossy()).required(false)
        };

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?

            // Load base config file
            .add_source(file("default"))

            // Load environment-specific config
            .add_source(file(&env))

            // Load local overrides
            .add_source(file("local"))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // Hosted database credentials under their usual names
            .set_override_option("storage.url", std::env::var("SUPABASE_URL").ok())?
            .set_override_option("storage.api_key", std::env::var("SUPABASE_ANON_KEY").ok())?

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML text, without environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration backed by the in-process store
    pub fn in_memory() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig {
                url: MEMORY_STORAGE_URL.to_string(),
                api_key: String::new(),
                table: default_table(),
                timeout_secs: default_storage_timeout(),
                batch_size: default_batch_size(),
            },
            search: SearchConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    /// Reject values the services cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "storage.url is required (or set SUPABASE_URL)".to_string(),
            ));
        }
        if self.search.page_size == 0 {
            return Err(ConfigError::Message("search.page_size must be positive".to_string()));
        }
        if self.storage.batch_size == 0 {
            return Err(ConfigError::Message("storage.batch_size must be positive".to_string()));
        }
        let probe = format!("2000-01-01T00:00:00{}", self.search.timezone_offset);
        if chrono::DateTime::parse_from_rfc3339(&probe).is_err() {
            return Err(ConfigError::Message(format!(
                "search.timezone_offset is not a UTC offset: {}",
                self.search.timezone_offset
            )));
        }
        Ok(())
    }

    /// Whether the in-process store is selected
    pub fn uses_memory_storage(&self) -> bool {
        self.storage.url == MEMORY_STORAGE_URL
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
