//! # Retrieval Protocol
//!
//! The contract a poller uses against the event store.
//!
//! A consumer keeps one piece of state, the last cursor it received. Each
//! poll sends that cursor and gets back a batch plus the cursor to send
//! next time. When a batch is empty the consumer keeps its current cursor
//! (see [`RetrievalResponse::advance`]). Because ids are unique and the
//! store selects with a strict `>`, a consumer that always advances never
//! sees a record twice and never misses one.

use super::{EventQuery, EventStore, EventStoreError, QueryMode};
use crate::event::EventRecord;
use crate::timestamp::CanonicalTimestamp;
use crate::EventId;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Batch size used when the caller does not ask for one
pub const DEFAULT_LIMIT: usize = 100;

/// Upper bound on the batch size a caller may request
pub const MAX_LIMIT: usize = 1000;

/// Batch size bounds applied to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl LimitPolicy {
    /// Absent or zero falls back to the default; anything larger than the
    /// maximum is clamped.
    pub fn effective(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.default_limit.min(self.max_limit),
            Some(n) => n.min(self.max_limit),
        }
    }
}

/// A poll as received from a consumer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Raw cursor as supplied; malformed values mean "no cursor"
    pub after: Option<String>,
    /// Legacy timestamp filter, ignored when a cursor is supplied
    pub since: Option<String>,
    pub limit: Option<usize>,
}

impl RetrievalRequest {
    /// Poll from a known cursor
    pub fn from_cursor(cursor: Option<EventId>) -> Self {
        Self {
            after: cursor.map(|id| id.to_string()),
            ..Self::default()
        }
    }

    /// Resolve the request into a store query.
    ///
    /// A supplied cursor always selects cursor mode, even when it does not
    /// parse, in which case the whole range is read. Without a cursor a
    /// non-empty `since` selects the legacy mode. With neither, the poll
    /// starts from the beginning of the sequence.
    pub fn query(&self) -> EventQuery {
        let after = self.after.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let since = self.since.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (after, since) {
            (Some(raw), _) => EventQuery::Cursor {
                after: EventId::parse_cursor(raw),
            },
            (None, Some(since)) => EventQuery::Timestamp {
                since: Some(since.to_string()),
            },
            (None, None) => EventQuery::Cursor { after: None },
        }
    }
}

/// A batch returned to a consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    /// Display order: timestamp descending, then id descending
    pub events: Vec<EventRecord>,
    pub count: usize,
    /// Timestamp of the first event in display order
    pub latest_timestamp: Option<CanonicalTimestamp>,
    /// Largest id in `events`; absent when `events` is empty
    pub next_cursor: Option<EventId>,
    pub mode: QueryMode,
}

impl RetrievalResponse {
    /// The cursor a consumer should hold after receiving this batch
    pub fn advance(&self, current: Option<EventId>) -> Option<EventId> {
        match (self.next_cursor, current) {
            (Some(next), Some(current)) => Some(next.max(current)),
            (next, current) => next.or(current),
        }
    }
}

/// Serve one poll
#[instrument(skip(store), fields(mode = tracing::field::Empty))]
pub async fn retrieve(
    store: &dyn EventStore,
    request: &RetrievalRequest,
    limits: LimitPolicy,
) -> Result<RetrievalResponse, EventStoreError> {
    let query = request.query();
    let limit = limits.effective(request.limit);
    tracing::Span::current().record("mode", tracing::field::debug(query.mode()));

    let batch = store.fetch(query, limit).await?;
    let latest_timestamp = batch.latest_timestamp().cloned();

    debug!(
        count = batch.records.len(),
        next_cursor = ?batch.next_cursor,
        "Served event batch"
    );

    Ok(RetrievalResponse {
        count: batch.records.len(),
        events: batch.records,
        latest_timestamp,
        next_cursor: batch.next_cursor,
        mode: batch.mode,
    })
}

#[cfg(test)]
#[path = "retrieval_tests.rs"]
mod tests;
