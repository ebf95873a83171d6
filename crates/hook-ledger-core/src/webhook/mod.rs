//! # Webhook Processing Module
//!
//! Turns inbound webhook deliveries into canonical event records.
//!
//! Normalizers never fail: every delivery produces either a
//! [`Normalization::Record`] ready for insertion or a
//! [`Normalization::NotApplicable`] carrying the reason nothing was
//! produced. Only request-level problems (no event header, no JSON body)
//! surface as [`WebhookError`].

use crate::event::{EventRecord, NewEventRecord};
use crate::store::EventStore;
use crate::{HookLedgerError, ValidationError};
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

pub mod payload;
pub mod pull_request;
pub mod push;

pub use pull_request::normalize_pull_request;
pub use push::normalize_push;

// ============================================================================
// Core Types
// ============================================================================

/// Raw HTTP request data from a webhook sender
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub headers: WebhookHeaders,
    pub body: Bytes,
}

impl WebhookRequest {
    /// Create new webhook request
    pub fn new(headers: WebhookHeaders, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Get event type from headers
    pub fn event_type(&self) -> &str {
        &self.headers.event_type
    }

    /// Get delivery ID from headers if the sender supplied one
    pub fn delivery_id(&self) -> Option<&str> {
        self.headers.delivery_id.as_deref()
    }

    /// Parse the body as a JSON document.
    ///
    /// A body that is empty, not JSON, or a JSON value carrying nothing
    /// (`null`, `{}`, `[]`, `""`, `false`, `0`) counts as a missing payload.
    pub fn payload(&self) -> Result<Value, WebhookError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(WebhookError::MissingPayload);
        }

        let value: Value =
            serde_json::from_slice(&self.body).map_err(|e| WebhookError::InvalidJson {
                message: e.to_string(),
            })?;

        if is_empty_document(&value) {
            return Err(WebhookError::MissingPayload);
        }

        Ok(value)
    }
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Webhook-specific HTTP headers used during processing
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    pub event_type: String,          // X-GitHub-Event
    pub delivery_id: Option<String>, // X-GitHub-Delivery
}

impl WebhookHeaders {
    /// Parse headers from HTTP header map
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let event_type = headers
            .get("x-github-event")
            .or_else(|| headers.get("X-GitHub-Event"))
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        let delivery_id = headers
            .get("x-github-delivery")
            .or_else(|| headers.get("X-GitHub-Delivery"))
            .filter(|v| !v.is_empty())
            .cloned();

        let headers = Self {
            event_type,
            delivery_id,
        };

        headers.validate()?;
        Ok(headers)
    }

    /// Validate header values
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_type.is_empty() {
            return Err(ValidationError::Required {
                field: "X-GitHub-Event".to_string(),
            });
        }

        Ok(())
    }
}

/// Upstream event kinds, keyed by the event-kind label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookKind {
    Push,
    PullRequest,
    /// Connectivity check sent when a webhook is first configured
    Ping,
    Unsupported(String),
}

impl WebhookKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "push" => Self::Push,
            "pull_request" => Self::PullRequest,
            "ping" => Self::Ping,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::Ping => "ping",
            Self::Unsupported(label) => label,
        }
    }
}

/// Outcome of normalizing one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// A record ready for insertion
    Record(NewEventRecord),
    /// No record is produced for this delivery
    NotApplicable(SkipReason),
}

/// Why a delivery produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Ping,
    UnsupportedKind { kind: String },
    /// Pull request verbs other than `opened` and `closed`
    IgnoredAction { action: String },
    /// Required nested structure missing or of the wrong type
    Malformed { kind: String, reason: String },
}

impl SkipReason {
    /// Stable label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::UnsupportedKind { .. } => "unsupported_kind",
            Self::IgnoredAction { .. } => "ignored_action",
            Self::Malformed { .. } => "malformed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => write!(f, "Webhook endpoint is active"),
            Self::UnsupportedKind { kind } => write!(f, "Event type '{}' not supported", kind),
            Self::IgnoredAction { action } => {
                write!(f, "Pull request action '{}' ignored", action)
            }
            Self::Malformed { kind, reason } => {
                write!(f, "Malformed {} payload ignored: {}", kind, reason)
            }
        }
    }
}

/// Map a payload onto an event record according to its event-kind label.
pub fn normalize_webhook(kind: &str, payload: &Value) -> Normalization {
    let outcome = match WebhookKind::from_label(kind) {
        WebhookKind::Push => normalize_push(payload),
        WebhookKind::PullRequest => normalize_pull_request(payload),
        WebhookKind::Ping => Normalization::NotApplicable(SkipReason::Ping),
        WebhookKind::Unsupported(kind) => {
            Normalization::NotApplicable(SkipReason::UnsupportedKind { kind })
        }
    };

    match &outcome {
        Normalization::Record(record) => debug!(
            kind = %kind,
            action = %record.action,
            request_id = %record.request_id,
            "Normalized webhook payload"
        ),
        Normalization::NotApplicable(reason @ SkipReason::Malformed { .. }) => {
            warn!(kind = %kind, reason = %reason, "Dropping malformed webhook payload")
        }
        Normalization::NotApplicable(reason) => {
            debug!(kind = %kind, reason = %reason, "Webhook produced no event")
        }
    }

    outcome
}

// ============================================================================
// Processing
// ============================================================================

/// Result of handling one delivery end to end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A record was produced and stored
    Stored(EventRecord),
    /// The delivery was acknowledged without storing anything
    Skipped(SkipReason),
}

/// Interface for turning webhook requests into event records
pub trait WebhookProcessor: Send + Sync {
    /// Validate the request and normalize its payload
    fn process_webhook(&self, request: &WebhookRequest) -> Result<Normalization, WebhookError>;
}

/// Processor for GitHub-style deliveries
#[derive(Debug, Clone, Default)]
pub struct GithubWebhookProcessor;

impl GithubWebhookProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl WebhookProcessor for GithubWebhookProcessor {
    fn process_webhook(&self, request: &WebhookRequest) -> Result<Normalization, WebhookError> {
        request.headers.validate()?;
        let payload = request.payload()?;

        Ok(normalize_webhook(request.event_type(), &payload))
    }
}

/// Process a delivery and store the resulting record, if any.
///
/// Storage failures are returned to the caller; nothing is retried here.
pub async fn ingest(
    processor: &dyn WebhookProcessor,
    store: &dyn EventStore,
    request: &WebhookRequest,
) -> Result<IngestOutcome, HookLedgerError> {
    info!(
        event_type = %request.event_type(),
        delivery_id = request.delivery_id().unwrap_or("-"),
        "Processing webhook request"
    );

    match processor.process_webhook(request)? {
        Normalization::Record(record) => {
            let stored = store.insert(record).await?;
            info!(
                event_id = %stored.id,
                action = %stored.action,
                author = %stored.author,
                "Stored webhook event"
            );
            Ok(IngestOutcome::Stored(stored))
        }
        Normalization::NotApplicable(reason) => Ok(IngestOutcome::Skipped(reason)),
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Request-level webhook failures
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Missing JSON payload")]
    MissingPayload,

    #[error("Invalid JSON payload: {message}")]
    InvalidJson { message: String },
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
