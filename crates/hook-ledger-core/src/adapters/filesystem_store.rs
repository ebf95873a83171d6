//! # Filesystem Event Store Adapter
//!
//! Durable append-only event log for single-node deployments.
//!
//! Layout under the data directory:
//!
//! - `events.jsonl`: one JSON record per line in ascending id order
//! - `sequence.json`: high-water mark of the id sequence, rewritten on clear
//!
//! Each insert is written, flushed and synced before its id becomes
//! visible. A failed write truncates the log back to its previous length;
//! if that truncate also fails, the next insert retries it before
//! appending and reports the store unavailable until it succeeds.

use crate::event::{EventRecord, NewEventRecord};
use crate::store::{
    page_from_ascending, timestamp_window, CursorPage, EventStore, EventStoreError, StoreHealth,
};
use crate::EventId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const LOG_FILE: &str = "events.jsonl";
const SEQUENCE_FILE: &str = "sequence.json";

/// Persisted high-water mark of the id sequence
#[derive(Debug, Default, Serialize, Deserialize)]
struct SequenceMark {
    last_id: u64,
}

struct LogState {
    file: File,
    /// Byte length of the committed log
    log_len: u64,
    /// Ascending id order
    records: Vec<EventRecord>,
    last_id: u64,
    /// Bytes past `log_len` may remain from a failed append
    needs_truncate: bool,
}

/// Result of replaying the log
struct ReplayedLog {
    records: Vec<EventRecord>,
    /// Byte length covered by complete, valid records
    committed: u64,
    /// Final record is valid but its newline was never written
    unterminated: bool,
}

/// Filesystem-based event store implementation
///
/// # Examples
///
/// ```no_run
/// use hook_ledger_core::adapters::FilesystemEventStore;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemEventStore::open("./data/events").await?;
/// # Ok(())
/// # }
/// ```
pub struct FilesystemEventStore {
    data_dir: PathBuf,
    state: Mutex<LogState>,
}

impl FilesystemEventStore {
    /// Open the store, replaying any existing log
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::Corrupted`] if a line other than the last
    /// cannot be decoded or ids are out of order, and
    /// [`EventStoreError::Io`] if the directory cannot be used.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, EventStoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| EventStoreError::Io {
                message: format!("Failed to create data directory {}: {}", data_dir.display(), e),
            })?;

        let mark = read_sequence_mark(&data_dir.join(SEQUENCE_FILE)).await?;
        let log_path = data_dir.join(LOG_FILE);
        let ReplayedLog {
            records,
            committed: mut log_len,
            unterminated,
        } = replay_log(&log_path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await?;

        // Drop any torn tail found during replay
        if file.metadata().await?.len() != log_len {
            file.set_len(log_len).await?;
            file.sync_all().await?;
        }

        // Terminate the last record so the next append starts a new line
        if unterminated {
            warn!(path = %log_path.display(), "Terminating final event log record");
            file.write_all(b"\n").await?;
            file.flush().await?;
            file.sync_data().await?;
            log_len += 1;
        }

        let last_id = records
            .last()
            .map(|r| r.id.as_u64())
            .unwrap_or(0)
            .max(mark.last_id);

        info!(
            data_dir = %data_dir.display(),
            records = records.len(),
            last_id,
            "Opened filesystem event store"
        );

        Ok(Self {
            data_dir,
            state: Mutex::new(LogState {
                file,
                log_len,
                records,
                last_id,
                needs_truncate: false,
            }),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn append(state: &mut LogState, line: &[u8]) -> std::io::Result<()> {
        state.file.write_all(line).await?;
        state.file.flush().await?;
        state.file.sync_data().await
    }
}

async fn read_sequence_mark(path: &Path) -> Result<SequenceMark, EventStoreError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| EventStoreError::Corrupted {
            message: format!("{}: {}", path.display(), e),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SequenceMark::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_sequence_mark(dir: &Path, mark: &SequenceMark) -> Result<(), EventStoreError> {
    let json = serde_json::to_vec(mark).map_err(|e| EventStoreError::Serialization {
        message: e.to_string(),
    })?;

    // Write to temporary file first (atomic write pattern)
    let temp_path = dir.join(format!("{SEQUENCE_FILE}.tmp"));
    let mut file = File::create(&temp_path).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, dir.join(SEQUENCE_FILE)).await?;
    Ok(())
}

async fn replay_log(path: &Path) -> Result<ReplayedLog, EventStoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ReplayedLog {
                records: Vec::new(),
                committed: 0,
                unterminated: false,
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut records: Vec<EventRecord> = Vec::new();
    let mut committed = 0usize;
    let mut unterminated = false;
    let mut lines = bytes.split_inclusive(|b| *b == b'\n').peekable();
    let mut line_number = 0usize;

    while let Some(line) = lines.next() {
        line_number += 1;
        let is_last = lines.peek().is_none();
        let terminated = line.ends_with(b"\n");
        let content = line.strip_suffix(b"\n").unwrap_or(line);

        if content.iter().all(u8::is_ascii_whitespace) {
            if terminated {
                committed += line.len();
            }
            continue;
        }

        match serde_json::from_slice::<EventRecord>(content) {
            Ok(record) => {
                if let Some(previous) = records.last() {
                    if record.id <= previous.id {
                        return Err(EventStoreError::Corrupted {
                            message: format!(
                                "{} line {}: id {} does not follow {}",
                                path.display(),
                                line_number,
                                record.id,
                                previous.id
                            ),
                        });
                    }
                }
                records.push(record);
                committed += line.len();
                unterminated = !terminated;
            }
            Err(e) if is_last => {
                warn!(
                    path = %path.display(),
                    line = line_number,
                    error = %e,
                    "Discarding torn final line of event log"
                );
            }
            Err(e) => {
                return Err(EventStoreError::Corrupted {
                    message: format!("{} line {}: {}", path.display(), line_number, e),
                });
            }
        }
    }

    Ok(ReplayedLog {
        records,
        committed: committed as u64,
        unterminated,
    })
}

#[async_trait]
impl EventStore for FilesystemEventStore {
    async fn insert(&self, record: NewEventRecord) -> Result<EventRecord, EventStoreError> {
        let mut state = self.state.lock().await;

        if state.needs_truncate {
            let committed = state.log_len;
            state
                .file
                .set_len(committed)
                .await
                .map_err(|e| EventStoreError::Unavailable {
                    message: format!("Event log has an uncommitted tail: {}", e),
                })?;
            state.needs_truncate = false;
            info!(log_len = committed, "Truncated uncommitted event log tail");
        }

        let stored = record.with_id(EventId::new(state.last_id + 1));
        let mut line = serde_json::to_vec(&stored).map_err(|e| EventStoreError::Serialization {
            message: e.to_string(),
        })?;
        line.push(b'\n');

        if let Err(e) = Self::append(&mut state, &line).await {
            let committed = state.log_len;
            if let Err(rollback) = state.file.set_len(committed).await {
                warn!(error = %rollback, "Failed to truncate event log after write failure");
                state.needs_truncate = true;
            }
            return Err(EventStoreError::Io {
                message: format!("Failed to append event record: {}", e),
            });
        }

        state.log_len += line.len() as u64;
        state.last_id = stored.id.as_u64();
        state.records.push(stored.clone());

        debug!(event_id = %stored.id, "Appended event record");
        Ok(stored)
    }

    async fn query_by_cursor(
        &self,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<CursorPage, EventStoreError> {
        let state = self.state.lock().await;
        Ok(page_from_ascending(&state.records, after, limit))
    }

    async fn query_by_timestamp(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let state = self.state.lock().await;
        Ok(timestamp_window(&state.records, since, limit))
    }

    async fn clear(&self) -> Result<u64, EventStoreError> {
        let mut state = self.state.lock().await;

        // Persist the high-water mark before dropping the records that carry it
        write_sequence_mark(
            &self.data_dir,
            &SequenceMark {
                last_id: state.last_id,
            },
        )
        .await?;

        state.file.set_len(0).await?;
        state.file.sync_all().await?;

        let deleted = state.records.len() as u64;
        state.records.clear();
        state.log_len = 0;
        state.needs_truncate = false;

        warn!(deleted, data_dir = %self.data_dir.display(), "Cleared filesystem event store");
        Ok(deleted)
    }

    async fn health_check(&self) -> Result<StoreHealth, EventStoreError> {
        fs::metadata(&self.data_dir)
            .await
            .map_err(|e| EventStoreError::Unavailable {
                message: format!("{}: {}", self.data_dir.display(), e),
            })?;

        let state = self.state.lock().await;
        Ok(StoreHealth {
            reachable: true,
            record_count: state.records.len() as u64,
            last_id: (state.last_id > 0).then(|| EventId::new(state.last_id)),
        })
    }
}

#[cfg(test)]
#[path = "filesystem_store_tests.rs"]
mod tests;
