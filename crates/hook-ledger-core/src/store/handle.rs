//! Process-wide shared store handle.
//!
//! The handle opens the configured backend on first use and reuses it for
//! the rest of the process. A failed open leaves the handle empty, so the
//! next call tries again. There is no teardown.

use super::{CursorPage, EventStore, EventStoreError, StoreHealth};
use crate::adapters::{FilesystemEventStore, InMemoryEventStore};
use crate::event::{EventRecord, NewEventRecord};
use crate::EventId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; the sequence restarts at 1 with the process
    Memory,
    /// Append-only JSON-lines log under `data_dir`
    #[default]
    Filesystem,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/events")
}

/// Lazily opened store shared by every request in the process
pub struct SharedEventStore {
    config: StorageConfig,
    inner: OnceCell<Arc<dyn EventStore>>,
}

impl SharedEventStore {
    /// Create a handle that opens `config`'s backend on first use
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    /// Create a handle around an already open store
    pub fn from_store(store: Arc<dyn EventStore>) -> Self {
        Self {
            config: StorageConfig::default(),
            inner: OnceCell::new_with(Some(store)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.initialized()
    }

    /// Get the open store, opening it first if needed
    pub async fn get(&self) -> Result<Arc<dyn EventStore>, EventStoreError> {
        self.inner
            .get_or_try_init(|| open_store(&self.config))
            .await
            .cloned()
    }
}

async fn open_store(config: &StorageConfig) -> Result<Arc<dyn EventStore>, EventStoreError> {
    let opened: Result<Arc<dyn EventStore>, EventStoreError> = match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryEventStore::new())),
        StorageBackend::Filesystem => FilesystemEventStore::open(&config.data_dir)
            .await
            .map(|store| Arc::new(store) as Arc<dyn EventStore>),
    };

    match &opened {
        Ok(_) => info!(backend = ?config.backend, data_dir = %config.data_dir.display(), "Opened event store"),
        Err(e) => error!(backend = ?config.backend, error = %e, "Failed to open event store"),
    }

    opened
}

#[async_trait]
impl EventStore for SharedEventStore {
    async fn insert(&self, record: NewEventRecord) -> Result<EventRecord, EventStoreError> {
        self.get().await?.insert(record).await
    }

    async fn query_by_cursor(
        &self,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<CursorPage, EventStoreError> {
        self.get().await?.query_by_cursor(after, limit).await
    }

    async fn query_by_timestamp(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        self.get().await?.query_by_timestamp(since, limit).await
    }

    async fn clear(&self) -> Result<u64, EventStoreError> {
        self.get().await?.clear().await
    }

    async fn health_check(&self) -> Result<StoreHealth, EventStoreError> {
        self.get().await?.health_check().await
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
