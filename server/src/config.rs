//! Server configuration

use serde::Deserialize;

use crate::domain::agent::AgentLifecycleConfig;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Database URL (SQLite)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Hard cap on workspace age in hours. A workspace older than this is
    /// terminated regardless of per-agent thresholds.
    #[serde(default = "default_max_hours_before_termination")]
    pub max_hours_before_termination: i64,

    /// Default hours before an active workspace is stopped, for agents
    /// without an explicit config
    #[serde(default = "default_max_active_hours_before_stop")]
    pub default_max_active_hours_before_stop: i64,

    /// Default hours before a stopped workspace is terminated, for agents
    /// without an explicit config
    #[serde(default = "default_max_stopped_hours_before_termination")]
    pub default_max_stopped_hours_before_termination: i64,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite:data/reconcile.db?mode=rwc".to_string()
}

fn default_max_hours_before_termination() -> i64 {
    120 // 5 days
}

fn default_max_active_hours_before_stop() -> i64 {
    36
}

fn default_max_stopped_hours_before_termination() -> i64 {
    722
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        // Start with default config as base
        let mut config = Config::default();

        // Override with environment variables
        if let Ok(val) = std::env::var("RECONCILE_HTTP_HOST") {
            config.http_host = val;
        }
        if let Ok(val) = std::env::var("RECONCILE_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http_port = port;
            }
        }
        if let Ok(val) = std::env::var("RECONCILE_DATABASE_URL") {
            config.database_url = val;
        }
        if let Ok(val) = std::env::var("RECONCILE_MAX_HOURS_BEFORE_TERMINATION") {
            if let Ok(hours) = val.parse() {
                config.max_hours_before_termination = hours;
            }
        }
        if let Ok(val) = std::env::var("RECONCILE_DEFAULT_MAX_ACTIVE_HOURS_BEFORE_STOP") {
            if let Ok(hours) = val.parse() {
                config.default_max_active_hours_before_stop = hours;
            }
        }
        if let Ok(val) = std::env::var("RECONCILE_DEFAULT_MAX_STOPPED_HOURS_BEFORE_TERMINATION") {
            if let Ok(hours) = val.parse() {
                config.default_max_stopped_hours_before_termination = hours;
            }
        }

        Ok(config)
    }

    /// Lifecycle thresholds applied to agents without an explicit config
    pub fn default_agent_lifecycle_config(&self) -> AgentLifecycleConfig {
        AgentLifecycleConfig {
            max_active_hours_before_stop: self.default_max_active_hours_before_stop,
            max_stopped_hours_before_termination: self.default_max_stopped_hours_before_termination,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            database_url: default_database_url(),
            max_hours_before_termination: default_max_hours_before_termination(),
            default_max_active_hours_before_stop: default_max_active_hours_before_stop(),
            default_max_stopped_hours_before_termination:
                default_max_stopped_hours_before_termination(),
        }
    }
}
