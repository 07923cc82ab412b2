use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level for this crate when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Shared secret the identity tokens are signed with (HS256)
    pub cloud_auth_jwt_secret: Option<String>,

    /// Seconds between server-sent WebSocket pings
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Seconds of inbound silence after which a connection is dropped
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Capacity of each connection's outbound event queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would evict live connections: a client that answers every
    /// ping can still be silent for up to one heartbeat interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout_secs < 2 * self.heartbeat_interval_secs.max(1) {
            return Err(ConfigError::IdleTimeoutTooShort {
                idle_timeout_secs: self.idle_timeout_secs,
                heartbeat_interval_secs: self.heartbeat_interval_secs,
            });
        }
        Ok(())
    }

    /// Fallback tracing filter used when RUST_LOG is unset
    pub fn log_filter(&self) -> String {
        format!("markup_collab={},tower_http=debug,axum::rejection=trace,info", self.log_level)
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Never shorter than two heartbeat intervals, even if validation was skipped
    pub fn idle_timeout(&self) -> Duration {
        let floor = 2 * self.heartbeat_interval_secs.max(1);
        Duration::from_secs(self.idle_timeout_secs.max(floor))
    }

    /// Parsed CORS origins, empty when unset
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            cloud_auth_jwt_secret: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),

    #[error("idle_timeout_secs ({idle_timeout_secs}) must be at least twice heartbeat_interval_secs ({heartbeat_interval_secs})")]
    IdleTimeoutTooShort {
        idle_timeout_secs: u64,
        heartbeat_interval_secs: u64,
    },
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    25
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_outbound_buffer() -> usize {
    256
}
