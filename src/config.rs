use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

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

    /// CORS allowed origins, comma separated. Any origin when unset.
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JWT secret key used to verify bearer tokens
    pub jwt_secret: Option<String>,

    /// Database URL
    pub db_url: Option<String>,

    /// Quiet period after the last edit before a session is persisted
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Outbound frames buffered per connection before it is evicted
    #[serde(default = "default_client_mailbox_capacity")]
    pub client_mailbox_capacity: usize,

    /// Pending events buffered per session actor
    #[serde(default = "default_session_mailbox_capacity")]
    pub session_mailbox_capacity: usize,
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

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
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
            jwt_secret: None,
            db_url: None,
            save_debounce_ms: default_save_debounce_ms(),
            client_mailbox_capacity: default_client_mailbox_capacity(),
            session_mailbox_capacity: default_session_mailbox_capacity(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tracing filter for the configured level: our crate and HTTP traces at
/// `debug` unless `trace` or a quieter level is asked for, the rest at `level`.
pub fn log_filter(level: &str) -> String {
    let level = level.trim().to_lowercase();
    let ours = match level.as_str() {
        "trace" | "warn" | "error" | "off" => level.as_str(),
        _ => "debug",
    };
    format!("sync_doc={ours},tower_http={ours},axum::rejection=trace,{level}")
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_save_debounce_ms() -> u64 {
    5_000
}

fn default_client_mailbox_capacity() -> usize {
    256
}

fn default_session_mailbox_capacity() -> usize {
    1024
}
