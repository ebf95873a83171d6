//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hook_ledger_core::{EventStoreError, HookLedgerError, ValidationError, WebhookError};
use tracing::{error, warn};

/// Seconds a sender should wait before retrying after a storage failure
const STORAGE_RETRY_AFTER_SECONDS: u64 = 30;

/// Webhook handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: request problems the sender cannot fix by retrying
///   (missing event header, missing or invalid JSON body)
/// - `503 Service Unavailable`: transient storage failures; senders retry
///   per their own policy
/// - `500 Internal Server Error`: permanent storage failures
///
/// Payloads that are merely unsupported or malformed are not errors. They
/// are acknowledged with `200 OK` and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Invalid or missing required HTTP headers
    #[error("Invalid headers: {0}")]
    InvalidHeaders(#[from] ValidationError),

    /// Body missing or not a JSON document
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] WebhookError),

    /// Event store rejected the insert; nothing was stored
    #[error("Storage failed: {0}")]
    StorageFailed(#[from] EventStoreError),
}

impl From<HookLedgerError> for WebhookHandlerError {
    fn from(e: HookLedgerError) -> Self {
        match e {
            HookLedgerError::Webhook(w) => Self::InvalidRequest(w),
            HookLedgerError::Storage(s) => Self::StorageFailed(s),
        }
    }
}

impl WebhookHandlerError {
    fn client_message(&self) -> String {
        match self {
            Self::InvalidHeaders(ValidationError::Required { field }) => {
                format!("Missing {} header", field)
            }
            Self::InvalidRequest(WebhookError::Validation(ValidationError::Required { field })) => {
                format!("Missing {} header", field)
            }
            Self::InvalidRequest(_) => "Missing JSON payload".to_string(),
            Self::StorageFailed(_) => "Event storage temporarily unavailable".to_string(),
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self {
            Self::InvalidHeaders(_) | Self::InvalidRequest(_) => {
                warn!(error = %self, "Rejected webhook request");
                (StatusCode::BAD_REQUEST, None)
            }
            Self::StorageFailed(e) if e.is_transient() => {
                error!(error = %e, "Webhook storage failed, sender should retry");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Some(STORAGE_RETRY_AFTER_SECONDS),
                )
            }
            Self::StorageFailed(e) => {
                error!(error = %e, "Webhook storage failed permanently");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = serde_json::json!({
            "error": self.client_message(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        with_retry_after((status, Json(body)).into_response(), retry_after)
    }
}

/// Retrieval and administrative handler errors
#[derive(Debug, thiserror::Error)]
pub enum EventsHandlerError {
    #[error("Failed to retrieve events: {0}")]
    Retrieval(EventStoreError),

    #[error("Failed to clear events: {0}")]
    Clear(EventStoreError),
}

impl IntoResponse for EventsHandlerError {
    fn into_response(self) -> Response {
        let (message, source) = match &self {
            Self::Retrieval(e) => ("Failed to retrieve events", e),
            Self::Clear(e) => ("Failed to clear events", e),
        };

        let (status, retry_after) = if source.is_transient() {
            (StatusCode::SERVICE_UNAVAILABLE, Some(STORAGE_RETRY_AFTER_SECONDS))
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, None)
        };

        error!(error = %source, status = %status, "{}", message);

        let body = serde_json::json!({
            "status": "error",
            "message": message,
            "error": source.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        with_retry_after((status, Json(body)).into_response(), retry_after)
    }
}

fn with_retry_after(mut response: Response, retry_after: Option<u64>) -> Response {
    if let Some(retry_seconds) = retry_after {
        if let Ok(header_value) = retry_seconds.to_string().parse() {
            response.headers_mut().insert("Retry-After", header_value);
        }
    }
    response
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}
