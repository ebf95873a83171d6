//! Persisted consumer cursor.
//!
//! The cursor is the only state a poller keeps between runs. It is written
//! only after a batch has been received in full, via a temporary file and a
//! rename, so an interrupted save leaves the previous cursor in place.

use crate::CliError;
use chrono::{DateTime, Utc};
use hook_ledger_core::EventId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STATE_FILE_NAME: &str = "cursor.json";

/// Contents of the state file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Largest id received so far; `None` before the first non-empty batch
    pub cursor: Option<EventId>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Location of the cursor state file
#[derive(Debug, Clone)]
pub struct CursorFile {
    path: PathBuf,
}

impl CursorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/hook-ledger/cursor.json`, or the working directory when
    /// the platform has no data directory
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("hook-ledger"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STATE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved state; a missing file is the initial state
    pub async fn load(&self) -> Result<CursorState, CliError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| self.error(e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CursorState::default()),
            Err(e) => Err(self.error(e)),
        }
    }

    /// Replace the saved state
    pub async fn save(&self, cursor: EventId) -> Result<CursorState, CliError> {
        let state = CursorState {
            cursor: Some(cursor),
            updated_at: Some(Utc::now()),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(e))?;
        }

        let contents = serde_json::to_vec_pretty(&state).map_err(|e| self.error(e))?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| self.error(e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.error(e))?;

        debug!(cursor = %cursor, path = %self.path.display(), "Saved cursor");
        Ok(state)
    }

    /// Forget the saved cursor; the next poll starts from the beginning
    pub async fn reset(&self) -> Result<bool, CliError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Cursor reset");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, e: impl std::fmt::Display) -> CliError {
        CliError::CursorState {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
