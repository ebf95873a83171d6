//! # Event Store
//!
//! Append-only persistence for event records with two read modes.
//!
//! - **Cursor mode** ([`EventStore::query_by_cursor`]) is authoritative. It
//!   selects by insertion sequence (`id > after`) and is immune to clock skew
//!   in the embedded timestamps.
//! - **Timestamp mode** ([`EventStore::query_by_timestamp`]) is kept for
//!   legacy consumers. It filters on the display timestamp and can skip or
//!   replay records whose timestamps collide or invert relative to
//!   insertion order.
//!
//! Both modes return records in display order: timestamp descending, then
//! id descending. Adapters share the selection logic in this module so the
//! two modes cannot drift apart per backend.

use crate::event::{EventRecord, NewEventRecord};
use crate::timestamp::CanonicalTimestamp;
use crate::EventId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod handle;
pub mod retrieval;

pub use handle::{SharedEventStore, StorageBackend, StorageConfig};

// ============================================================================
// Query Types
// ============================================================================

/// Which read path served a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Cursor,
    Timestamp,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Timestamp => "timestamp",
        }
    }
}

/// A read request against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventQuery {
    /// Records inserted after `after`, or all records when absent
    Cursor { after: Option<EventId> },
    /// Legacy: records whose display timestamp sorts after `since`
    Timestamp { since: Option<String> },
}

impl EventQuery {
    pub fn mode(&self) -> QueryMode {
        match self {
            Self::Cursor { .. } => QueryMode::Cursor,
            Self::Timestamp { .. } => QueryMode::Timestamp,
        }
    }
}

/// Result of a cursor query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorPage {
    /// Records in display order
    pub records: Vec<EventRecord>,
    /// Largest id in `records`, absent when the page is empty
    pub next_cursor: Option<EventId>,
}

/// Records returned by either query mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    pub mode: QueryMode,
    pub records: Vec<EventRecord>,
    pub next_cursor: Option<EventId>,
}

impl EventBatch {
    /// Timestamp of the first record in display order
    pub fn latest_timestamp(&self) -> Option<&CanonicalTimestamp> {
        self.records.first().map(|r| &r.timestamp)
    }
}

/// Store connectivity report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHealth {
    pub reachable: bool,
    pub record_count: u64,
    pub last_id: Option<EventId>,
}

// ============================================================================
// Store Interface
// ============================================================================

/// Interface for event record persistence
///
/// Implementations must assign ids from a strictly increasing sequence and
/// make an inserted record visible to every query issued after `insert`
/// returns. An insert either fully succeeds or leaves nothing behind.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one record, assigning the next id in the sequence
    async fn insert(&self, record: NewEventRecord) -> Result<EventRecord, EventStoreError>;

    /// Records with `id > after`, capped at `limit` in id order, returned in
    /// display order together with the largest id served
    async fn query_by_cursor(
        &self,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<CursorPage, EventStoreError>;

    /// Legacy: records with `timestamp > since` in display order, capped at
    /// `limit`
    async fn query_by_timestamp(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError>;

    /// Delete all records, returning how many were removed.
    ///
    /// The id sequence is not reset.
    async fn clear(&self) -> Result<u64, EventStoreError>;

    /// Report connectivity and record count
    async fn health_check(&self) -> Result<StoreHealth, EventStoreError>;

    /// Run either query mode
    async fn fetch(&self, query: EventQuery, limit: usize) -> Result<EventBatch, EventStoreError> {
        match query {
            EventQuery::Cursor { after } => {
                let page = self.query_by_cursor(after, limit).await?;
                Ok(EventBatch {
                    mode: QueryMode::Cursor,
                    records: page.records,
                    next_cursor: page.next_cursor,
                })
            }
            EventQuery::Timestamp { since } => {
                let records = self.query_by_timestamp(since.as_deref(), limit).await?;
                let next_cursor = records.iter().map(|r| r.id).max();
                Ok(EventBatch {
                    mode: QueryMode::Timestamp,
                    records,
                    next_cursor,
                })
            }
        }
    }
}

// ============================================================================
// Shared Selection Logic
// ============================================================================

/// Sort records newest first by display timestamp, ties broken by id.
pub fn sort_for_display(records: &mut [EventRecord]) {
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Build a cursor page from records held in ascending id order.
pub fn page_from_ascending<'a, I>(records: I, after: Option<EventId>, limit: usize) -> CursorPage
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut selected: Vec<EventRecord> = records
        .into_iter()
        .filter(|r| after.map_or(true, |cursor| r.id > cursor))
        .take(limit)
        .cloned()
        .collect();

    let next_cursor = selected.iter().map(|r| r.id).max();
    sort_for_display(&mut selected);

    CursorPage {
        records: selected,
        next_cursor,
    }
}

/// Select the legacy timestamp window from any collection of records.
pub fn timestamp_window<'a, I>(records: I, since: Option<&str>, limit: usize) -> Vec<EventRecord>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let since = since.map(str::trim).filter(|s| !s.is_empty());

    let mut selected: Vec<EventRecord> = records
        .into_iter()
        .filter(|r| since.map_or(true, |bound| r.timestamp.as_str() > bound))
        .cloned()
        .collect();

    sort_for_display(&mut selected);
    selected.truncate(limit);
    selected
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors from event store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventStoreError {
    #[error("Event store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Event store I/O failed: {message}")]
    Io { message: String },

    #[error("Event record serialization failed: {message}")]
    Serialization { message: String },

    #[error("Event store is corrupted: {message}")]
    Corrupted { message: String },
}

impl EventStoreError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Io { .. } => true,
            Self::Serialization { .. } => false,
            Self::Corrupted { .. } => false,
        }
    }
}

impl From<std::io::Error> for EventStoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
