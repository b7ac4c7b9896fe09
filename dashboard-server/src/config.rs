//! Configuration module

use std::env;

use threatflow_core::{ConfigError, ServiceConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// WebSocket ping interval in seconds
    pub ws_ping_secs: u64,

    /// Pipeline, model and explainer settings
    pub service: ServiceConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            ws_ping_secs: env::var("WS_PING_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(30),

            service: ServiceConfig::from_env()?,
        })
    }
}
