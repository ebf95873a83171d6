//! Client half of the retrieval protocol.
//!
//! Each poll sends the saved cursor, hands the batch to the caller, and only
//! then commits the advanced cursor. A failure anywhere before the commit
//! leaves the cursor where it was, so the same batch is fetched again on the
//! next poll.

use crate::client::EventsClient;
use crate::cursor::CursorFile;
use crate::CliError;
use hook_ledger_core::{EventId, RetrievalResponse};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one committed poll
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub batch: RetrievalResponse,
    /// Cursor held after the poll
    pub cursor: Option<EventId>,
}

pub struct Poller {
    client: EventsClient,
    cursor_file: CursorFile,
    limit: Option<usize>,
}

impl Poller {
    pub fn new(client: EventsClient, cursor_file: CursorFile, limit: Option<usize>) -> Self {
        Self {
            client,
            cursor_file,
            limit,
        }
    }

    /// Poll once, let `handle` consume the batch, then commit the cursor
    pub async fn poll_once<F>(&self, handle: F) -> Result<PollOutcome, CliError>
    where
        F: FnOnce(&RetrievalResponse) -> Result<(), CliError>,
    {
        let state = self.cursor_file.load().await?;
        let batch = self.client.poll(state.cursor, self.limit).await?;

        handle(&batch)?;

        let cursor = batch.advance(state.cursor);
        if let Some(next) = cursor.filter(|next| Some(*next) != state.cursor) {
            self.cursor_file.save(next).await?;
        }

        Ok(PollOutcome { batch, cursor })
    }

    /// Poll until the service reports no more records.
    ///
    /// A batch smaller than the requested limit ends the drain. Without an
    /// explicit limit the service's default is unknown, so a single poll is
    /// made.
    pub async fn drain<F>(&self, mut handle: F) -> Result<PollOutcome, CliError>
    where
        F: FnMut(&RetrievalResponse) -> Result<(), CliError>,
    {
        loop {
            let outcome = self.poll_once(&mut handle).await?;
            let full_batch = matches!(self.limit, Some(limit) if outcome.batch.count >= limit);
            if !full_batch || outcome.batch.count == 0 {
                return Ok(outcome);
            }
        }
    }

    /// Drain on every tick of `interval` until `shutdown` resolves.
    ///
    /// Failed polls are logged and retried on the next tick.
    pub async fn watch<F, S>(&self, interval: Duration, mut handle: F, shutdown: S)
    where
        F: FnMut(&RetrievalResponse) -> Result<(), CliError>,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            url = %self.client.base_url(),
            interval_secs = interval.as_secs(),
            "Watching for new events"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping watch");
                    return;
                }
                _ = ticker.tick() => {
                    match self.drain(&mut handle).await {
                        Ok(outcome) => {
                            if outcome.batch.count > 0 {
                                info!(
                                    count = outcome.batch.count,
                                    cursor = ?outcome.cursor,
                                    "Received events"
                                );
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Poll failed; cursor not advanced");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
