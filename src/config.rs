//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidValue("LOG_FORMAT")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// Age after which a PENDING transaction needs manual reconciliation
    pub stale_pending_after: Duration,

    /// HS256 secret for session tokens
    pub jwt_secret: String,

    /// Session token lifetime
    pub jwt_ttl: Duration,
}

/// Used outside production when `JWT_SECRET` is unset
const DEVELOPMENT_JWT_SECRET: &str = "wallet-ledger-development-secret";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = var("HOST", "127.0.0.1");

        let port = var("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var("ENVIRONMENT", "development");

        let log_format = var("LOG_FORMAT", "pretty").parse()?;

        let stale_pending_after = var("STALE_PENDING_AFTER_SECS", "900")
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue("STALE_PENDING_AFTER_SECS"))?;

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if environment == "production" => return Err(ConfigError::MissingEnv("JWT_SECRET")),
            _ => DEVELOPMENT_JWT_SECRET.to_string(),
        };

        let jwt_ttl = var("JWT_TTL_SECS", "1800")
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue("JWT_TTL_SECS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            log_format,
            stale_pending_after,
            jwt_secret,
            jwt_ttl,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
