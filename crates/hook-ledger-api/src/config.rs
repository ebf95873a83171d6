//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use hook_ledger_core::store::retrieval::{LimitPolicy, DEFAULT_LIMIT, MAX_LIMIT};
use hook_ledger_core::StorageConfig;
use serde::{Deserialize, Serialize};

/// Paths served by fixed routes; the webhook endpoint may not reuse them
const RESERVED_PATHS: &[&str] = &[
    "/api/events",
    "/admin/events",
    "/health",
    "/health/deep",
    "/ready",
    "/metrics",
];

/// Service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook intake settings
    pub webhooks: WebhookConfig,

    /// Event retrieval settings
    pub events: EventsConfig,

    /// Event store settings
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check cross-field constraints the serde defaults cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        let path = &self.webhooks.endpoint_path;
        if !path.starts_with('/') || path.len() < 2 {
            return Err(ConfigError::Invalid {
                message: format!("webhooks.endpoint_path '{}' must be an absolute path", path),
            });
        }
        if RESERVED_PATHS.contains(&path.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("webhooks.endpoint_path '{}' collides with a built-in route", path),
            });
        }

        if self.events.default_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "events.default_limit must be greater than zero".to_string(),
            });
        }
        if self.events.max_limit < self.events.default_limit {
            return Err(ConfigError::Invalid {
                message: format!(
                    "events.max_limit ({}) must not be smaller than events.default_limit ({})",
                    self.events.max_limit, self.events.default_limit
                ),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
            enable_cors: true,
        }
    }
}

/// Webhook intake configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
        }
    }
}

/// Event retrieval configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Batch size when a poll does not ask for one
    pub default_limit: usize,

    /// Largest batch a poll may request
    pub max_limit: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl EventsConfig {
    pub fn limits(&self) -> LimitPolicy {
        LimitPolicy {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
