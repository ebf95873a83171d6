//! Normalizer for pull request deliveries.
//!
//! | upstream action | merged | result          |
//! |-----------------|--------|-----------------|
//! | `closed`        | true   | `MERGE`         |
//! | `opened`        | any    | `PULL_REQUEST`  |
//! | `closed`        | false  | `PULL_REQUEST`  |
//! | anything else   | any    | not applicable  |

use super::payload::{self, Object, ShapeError};
use super::{Normalization, SkipReason};
use crate::event::{EventAction, NewEventRecord};
use crate::timestamp::normalize_timestamp;
use serde_json::Value;

pub fn normalize_pull_request(payload: &Value) -> Normalization {
    let malformed = |ShapeError(reason)| {
        Normalization::NotApplicable(SkipReason::Malformed {
            kind: "pull_request".to_string(),
            reason,
        })
    };

    let root = match payload::root(payload) {
        Ok(root) => Some(root),
        Err(e) => return malformed(e),
    };

    let verb = payload::text(root, "action").unwrap_or_default();
    if verb != "opened" && verb != "closed" {
        return Normalization::NotApplicable(SkipReason::IgnoredAction {
            action: verb.to_string(),
        });
    }

    let pr = match payload::nested(root, "pull_request") {
        Ok(Some(pr)) => pr,
        Ok(None) => return malformed(ShapeError("missing 'pull_request' object".to_string())),
        Err(e) => return malformed(e),
    };

    match build_record(verb, pr) {
        Ok(record) => Normalization::Record(record),
        Err(e) => malformed(e),
    }
}

fn build_record(verb: &str, pr: &Object) -> Result<NewEventRecord, ShapeError> {
    let pr = Some(pr);
    let user = payload::nested(pr, "user")?;
    let head = payload::nested(pr, "head")?;
    let base = payload::nested(pr, "base")?;

    let action = if verb == "closed" && payload::flag(pr, "merged") {
        EventAction::Merge
    } else {
        EventAction::PullRequest
    };

    let raw_timestamp = payload::text(pr, "updated_at").or_else(|| payload::text(pr, "created_at"));

    Ok(NewEventRecord {
        request_id: payload::identifier(pr, "number").unwrap_or_default(),
        author: payload::text_or_empty(user, "login"),
        action,
        from_branch: payload::text_or_empty(head, "ref"),
        to_branch: payload::text_or_empty(base, "ref"),
        timestamp: normalize_timestamp(raw_timestamp),
    })
}

#[cfg(test)]
#[path = "pull_request_tests.rs"]
mod tests;
