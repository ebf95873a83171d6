//! # Hook-Ledger Core
//!
//! Core business logic for the hook-ledger webhook intake and polling service.
//!
//! This crate turns version-control webhook deliveries (branch pushes, pull
//! request openings and merges) into a canonical [`EventRecord`], persists
//! those records through the [`EventStore`] abstraction and serves them back
//! to a polling consumer through a cursor protocol that never skips or
//! repeats a record, even when the embedded timestamps arrive out of order.
//!
//! ## Architecture
//!
//! - [`timestamp`] converts arbitrary upstream timestamps to the canonical
//!   `YYYY-MM-DD HH:MM:SS UTC` display form.
//! - [`webhook`] maps raw payload trees onto [`NewEventRecord`] values, or
//!   reports why no record was produced.
//! - [`store`] defines the append-only store contract, both query modes and
//!   the retrieval protocol used by pollers.
//! - [`adapters`] contains the in-memory and filesystem store implementations.
//!
//! ## Usage
//!
//! ```rust
//! use hook_ledger_core::webhook::{normalize_webhook, Normalization};
//! use serde_json::json;
//!
//! let payload = json!({
//!     "ref": "refs/heads/main",
//!     "after": "0123456789abcdef0123456789abcdef01234567",
//!     "pusher": { "name": "alice" },
//!     "head_commit": { "timestamp": "2024-01-29T10:00:00Z" }
//! });
//!
//! match normalize_webhook("push", &payload) {
//!     Normalization::Record(record) => assert_eq!(record.to_branch, "main"),
//!     Normalization::NotApplicable(reason) => panic!("unexpected skip: {reason}"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Identifier assigned to an event record by the store at insert time.
///
/// Identifiers are drawn from a strictly increasing sequence: a record
/// inserted later always carries a larger id than any record inserted before
/// it. Pollers compare ids with `>` to find records they have not seen yet.
///
/// On the wire the id is an opaque decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(u64);

impl EventId {
    /// Create an event id from a raw sequence number
    pub const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Get the raw sequence number
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse a cursor supplied by a client.
    ///
    /// Returns `None` for anything that is not a valid id so callers can
    /// fall back to a full-range query instead of rejecting the request.
    pub fn parse_cursor(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sequence = s.parse::<u64>().map_err(|_| ParseError::InvalidFormat {
            expected: "non-negative integer event id".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(sequence))
    }
}

impl TryFrom<String> for EventId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

/// Failure while ingesting a webhook delivery
#[derive(Debug, thiserror::Error)]
pub enum HookLedgerError {
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Event store error: {0}")]
    Storage(#[from] EventStoreError),
}

// ============================================================================
// Module declarations
// ============================================================================

/// Canonical event record model
pub mod event;

/// Upstream timestamp normalization
pub mod timestamp;

/// Webhook request model and payload normalizers
pub mod webhook;

/// Event store contract and retrieval protocol
pub mod store;

/// Storage adapters module for infrastructure implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{FilesystemEventStore, InMemoryEventStore};
pub use event::{EventAction, EventRecord, NewEventRecord};
pub use store::{
    retrieval::{retrieve, LimitPolicy, RetrievalRequest, RetrievalResponse},
    CursorPage, EventBatch, EventQuery, EventStore, EventStoreError, QueryMode, SharedEventStore,
    StorageBackend, StorageConfig, StoreHealth,
};
pub use timestamp::{normalize_timestamp, CanonicalTimestamp};
pub use webhook::{
    ingest, normalize_webhook, GithubWebhookProcessor, IngestOutcome, Normalization, SkipReason,
    WebhookError, WebhookHeaders, WebhookKind, WebhookProcessor, WebhookRequest,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
