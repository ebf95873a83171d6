//! In-memory event store.

use crate::event::{EventRecord, NewEventRecord};
use crate::store::{
    page_from_ascending, timestamp_window, CursorPage, EventStore, EventStoreError, StoreHealth,
};
use crate::EventId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct MemoryState {
    /// Ascending id order
    records: Vec<EventRecord>,
    last_id: u64,
}

/// Event store held in process memory.
///
/// Ids are assigned under the write lock, so concurrent inserts never
/// share or reorder an id. An availability switch lets tests simulate an
/// unreachable store.
#[derive(Debug)]
pub struct InMemoryEventStore {
    state: RwLock<MemoryState>,
    available: AtomicBool,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store becoming unreachable or recovering
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_available(&self) -> Result<(), EventStoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EventStoreError::Unavailable {
                message: "in-memory store switched off".to_string(),
            })
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, record: NewEventRecord) -> Result<EventRecord, EventStoreError> {
        self.ensure_available()?;

        let mut state = self.state.write().await;
        state.last_id += 1;
        let stored = record.with_id(EventId::new(state.last_id));
        state.records.push(stored.clone());

        debug!(event_id = %stored.id, "Inserted event record");
        Ok(stored)
    }

    async fn query_by_cursor(
        &self,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<CursorPage, EventStoreError> {
        self.ensure_available()?;

        let state = self.state.read().await;
        Ok(page_from_ascending(&state.records, after, limit))
    }

    async fn query_by_timestamp(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        self.ensure_available()?;

        let state = self.state.read().await;
        Ok(timestamp_window(&state.records, since, limit))
    }

    async fn clear(&self) -> Result<u64, EventStoreError> {
        self.ensure_available()?;

        let mut state = self.state.write().await;
        let deleted = state.records.len() as u64;
        state.records.clear();

        warn!(deleted, "Cleared in-memory event store");
        Ok(deleted)
    }

    async fn health_check(&self) -> Result<StoreHealth, EventStoreError> {
        self.ensure_available()?;

        let state = self.state.read().await;
        Ok(StoreHealth {
            reachable: true,
            record_count: state.records.len() as u64,
            last_id: (state.last_id > 0).then(|| EventId::new(state.last_id)),
        })
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
