//! Core configuration structures for the jit-kitchen tracking service

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Service-level settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Decision engine tunables
    #[serde(default)]
    pub engine: EngineSettings,

    /// ETA provider client settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Order store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Notification channel settings
    #[serde(default)]
    pub channel: ChannelSettings,
}

/// Service environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Environment type (production, staging, local)
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Metrics server port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Local,
}

/// Decision engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Minimum spacing between provider calls per order, in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Trigger when slack falls to this many minutes (inclusive)
    #[serde(default = "default_slack_buffer_minutes")]
    pub slack_buffer_minutes: i64,

    /// Optional geometric prefilter radius in meters; unset disables it
    #[serde(default)]
    pub prefilter_radius_meters: Option<f64>,
}

/// ETA provider client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Distance matrix endpoint base URL
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Assumed speed for the degraded great-circle estimator, km/h
    #[serde(default = "default_fallback_speed_kmh")]
    pub fallback_speed_kmh: f64,
}

/// Order store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Keep orders in process memory instead of SQLite (tests, demos)
    #[serde(default)]
    pub in_memory: bool,

    /// SQLite database path
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

/// Notification channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Per-order topic buffer capacity
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
}

// Default value functions
fn default_environment() -> Environment {
    Environment::Local
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_slack_buffer_minutes() -> i64 {
    1
}

fn default_provider_endpoint() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_api_key_env() -> String {
    "DISTANCE_MATRIX_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_fallback_speed_kmh() -> f64 {
    30.0
}

fn default_database_path() -> String {
    "jit_kitchen.db".to_string()
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            slack_buffer_minutes: default_slack_buffer_minutes(),
            prefilter_radius_meters: None,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_provider_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            fallback_speed_kmh: default_fallback_speed_kmh(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            in_memory: false,
            database_path: default_database_path(),
        }
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            capacity: default_channel_capacity(),
        }
    }
}
