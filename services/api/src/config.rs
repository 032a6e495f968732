//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// How often the identity watchdog re-checks the pending buffer.
    pub watchdog_interval_secs: u64,
    /// Total window, from connection start, after which the watchdog gives up.
    pub watchdog_window_secs: u64,
    /// Maximum persistence attempts per transcript turn.
    pub persist_max_attempts: u32,
    /// First retry delay; subsequent delays double.
    pub persist_backoff_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Pipeline Tuning Settings ---
        let watchdog_interval_secs = env_u64("WATCHDOG_INTERVAL_SECS", 2)?;
        let watchdog_window_secs = env_u64("WATCHDOG_WINDOW_SECS", 30)?;
        let persist_max_attempts = env_u64("PERSIST_MAX_ATTEMPTS", 3)? as u32;
        let persist_backoff_secs = env_u64("PERSIST_BACKOFF_SECS", 1)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            watchdog_interval_secs,
            watchdog_window_secs,
            persist_max_attempts,
            persist_backoff_secs,
        })
    }
}

/// Reads an optional numeric environment variable, falling back to a default.
fn env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a whole number", raw),
            )
        }),
        Err(_) => Ok(default),
    }
}
