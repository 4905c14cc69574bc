//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::matchmaking::registry::DEFAULT_MATCH_CAPACITY;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS; `*` or a comma-separated list
    pub client_origin: String,
    /// Players per match before a new one opens
    pub match_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosts that inject PORT win over SERVER_ADDR
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let match_capacity = match var("MATCH_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidNumber("MATCH_CAPACITY", raw)),
            },
            None => DEFAULT_MATCH_CAPACITY,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: var("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            match_capacity,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("{0} must be a positive integer, got {1:?}")]
    InvalidNumber(&'static str, String),
}
