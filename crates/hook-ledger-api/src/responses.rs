//! Response types, query parameters, and supporting types for the API.

use crate::health::HealthCheckResult;
use chrono::{DateTime, Utc};
use hook_ledger_core::{EventAction, EventId, RetrievalRequest, RetrievalResponse, SkipReason};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Response Types
// ============================================================================

/// Webhook stored as an event record
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub event: EventAction,
    pub author: String,
    pub id: EventId,
}

/// Webhook acknowledged without storing anything
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub status: String,
    pub message: String,
}

impl From<&SkipReason> for WebhookAckResponse {
    fn from(reason: &SkipReason) -> Self {
        Self {
            status: "success".to_string(),
            message: reason.to_string(),
        }
    }
}

/// Either outcome of a successful webhook delivery
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookOutcomeResponse {
    Stored(WebhookResponse),
    Acknowledged(WebhookAckResponse),
}

/// Event batch served to a poller
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub status: String,
    #[serde(flatten)]
    pub batch: RetrievalResponse,
}

impl EventsResponse {
    pub fn success(batch: RetrievalResponse) -> Self {
        Self {
            status: "success".to_string(),
            batch,
        }
    }
}

/// Administrative clear result
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub status: String,
    pub deleted: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, HealthCheckResult>,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Query Parameter Types
// ============================================================================

/// Parameters for event retrieval
///
/// All values arrive as strings so that a malformed value degrades to its
/// default instead of rejecting the poll.
#[derive(Debug, Default, Deserialize)]
pub struct EventsParams {
    pub after: Option<String>,
    pub since: Option<String>,
    pub limit: Option<String>,
}

impl EventsParams {
    pub fn into_request(self) -> RetrievalRequest {
        RetrievalRequest {
            after: self.after,
            since: self.since,
            limit: self.limit.and_then(|raw| raw.trim().parse().ok()),
        }
    }
}
