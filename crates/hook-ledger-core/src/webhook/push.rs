//! Normalizer for branch push deliveries.

use super::payload::{self, ShapeError};
use super::{Normalization, SkipReason};
use crate::event::{EventAction, NewEventRecord};
use crate::timestamp::normalize_timestamp;
use serde_json::Value;

/// Upstream commit hashes are 40 hex characters
pub const COMMIT_ID_LENGTH: usize = 40;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Map a push payload onto an event record.
///
/// The `ref` field is required. Everything else falls back: the commit id
/// to the `after` pointer and then to empty, the pusher name to the head
/// commit's author name, the timestamp to the current time.
pub fn normalize_push(payload: &Value) -> Normalization {
    match build_record(payload) {
        Ok(record) => Normalization::Record(record),
        Err(ShapeError(reason)) => Normalization::NotApplicable(SkipReason::Malformed {
            kind: "push".to_string(),
            reason,
        }),
    }
}

fn build_record(payload: &Value) -> Result<NewEventRecord, ShapeError> {
    let root = Some(payload::root(payload)?);
    let head_commit = payload::nested(root, "head_commit")?;
    let pusher = payload::nested(root, "pusher")?;
    let commit_author = payload::nested(head_commit, "author")?;

    let git_ref = payload::text(root, "ref")
        .ok_or_else(|| ShapeError("push payload carries no ref".to_string()))?;
    let branch = git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref);

    let request_id = payload::text(head_commit, "id")
        .or_else(|| payload::text(root, "after"))
        .map(|commit| commit.chars().take(COMMIT_ID_LENGTH).collect())
        .unwrap_or_default();

    let author = payload::text(pusher, "name")
        .or_else(|| payload::text(commit_author, "name"))
        .unwrap_or_default()
        .to_string();

    Ok(NewEventRecord {
        request_id,
        author,
        action: EventAction::Push,
        from_branch: branch.to_string(),
        to_branch: branch.to_string(),
        timestamp: normalize_timestamp(payload::text(head_commit, "timestamp")),
    })
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
