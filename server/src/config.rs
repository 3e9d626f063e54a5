//! Configuration management for the server.

use std::env;

use axum::http::HeaderValue;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Largest accepted update batch
    pub max_batch_size: usize,
    /// Allowed CORS origins, any origin when empty
    pub cors_origins: Vec<HeaderValue>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_batch_size: 1000,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a variable lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let max_batch_size = match lookup("MAX_BATCH_SIZE") {
            Some(size) => size
                .parse()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidBatchSize)?,
            None => defaults.max_batch_size,
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty() && *origin != "*")
                    .map(|origin| {
                        HeaderValue::from_str(origin)
                            .map_err(|_| ConfigError::InvalidCorsOrigin(origin.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            max_batch_size,
            cors_origins,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid MAX_BATCH_SIZE value, expected a positive integer")]
    InvalidBatchSize,

    #[error("Invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
}
