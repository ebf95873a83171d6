//! # Storage Adapters
//!
//! Concrete [`EventStore`](crate::store::EventStore) implementations.
//!
//! - [`InMemoryEventStore`]: process memory, for tests and single-run tools
//! - [`FilesystemEventStore`]: durable append-only JSON-lines log

pub mod filesystem_store;
pub mod memory_store;

pub use filesystem_store::FilesystemEventStore;
pub use memory_store::InMemoryEventStore;
