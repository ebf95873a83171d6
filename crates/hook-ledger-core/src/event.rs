//! # Event Record Model
//!
//! The canonical normalized unit stored and served by hook-ledger.
//!
//! A record starts life as a [`NewEventRecord`] produced by a payload
//! normalizer. The store assigns its [`EventId`] at insert time and hands
//! back an [`EventRecord`], which is immutable from then on.

use crate::timestamp::CanonicalTimestamp;
use crate::EventId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of actions an event record can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    /// Commits pushed to a branch
    Push,
    /// Pull request opened, or closed without merging
    PullRequest,
    /// Pull request closed by merging
    Merge,
}

impl EventAction {
    /// Wire label of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "PUSH",
            Self::PullRequest => "PULL_REQUEST",
            Self::Merge => "MERGE",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event record awaiting insertion; carries everything except the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEventRecord {
    /// Commit hash for pushes, pull request number for pull request events.
    /// Not unique across event kinds.
    pub request_id: String,
    /// May be empty when the upstream payload omits it
    pub author: String,
    pub action: EventAction,
    pub from_branch: String,
    pub to_branch: String,
    /// Display and legacy filtering only; never used for ordering guarantees
    pub timestamp: CanonicalTimestamp,
}

impl NewEventRecord {
    /// Attach the store-assigned id
    pub fn with_id(self, id: EventId) -> EventRecord {
        EventRecord {
            id,
            request_id: self.request_id,
            author: self.author,
            action: self.action,
            from_branch: self.from_branch,
            to_branch: self.to_branch,
            timestamp: self.timestamp,
        }
    }
}

/// Stored event record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub request_id: String,
    pub author: String,
    pub action: EventAction,
    pub from_branch: String,
    pub to_branch: String,
    pub timestamp: CanonicalTimestamp,
}

impl EventRecord {
    /// One-line human readable summary of the event
    pub fn describe(&self) -> String {
        match self.action {
            EventAction::Push => format!(
                "{} pushed to {} on {}",
                self.author, self.to_branch, self.timestamp
            ),
            EventAction::PullRequest => format!(
                "{} submitted a pull request from {} to {} on {}",
                self.author, self.from_branch, self.to_branch, self.timestamp
            ),
            EventAction::Merge => format!(
                "{} merged branch {} to {} on {}",
                self.author, self.from_branch, self.to_branch, self.timestamp
            ),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
