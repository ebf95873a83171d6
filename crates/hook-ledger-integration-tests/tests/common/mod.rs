//! Common test utilities for hook-ledger-api integration tests
//!
//! This module provides:
//! - Router construction over in-memory and filesystem stores
//! - A store double that fails a configurable number of inserts
//! - Request helpers and payload builders

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hook_ledger_api::{create_router, AppState, ServiceConfig, ServiceMetrics, StoreHealthChecker};
use hook_ledger_core::{
    CursorPage, EventId, EventRecord, EventStore, EventStoreError, FilesystemEventStore,
    GithubWebhookProcessor, InMemoryEventStore, NewEventRecord, StoreHealth,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Flaky Event Store
// ============================================================================

/// In-memory store whose first `failures` inserts report the store as
/// unavailable without storing anything
#[allow(dead_code)]
pub struct FlakyEventStore {
    inner: InMemoryEventStore,
    remaining_failures: AtomicUsize,
    insert_attempts: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyEventStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: InMemoryEventStore::new(),
            remaining_failures: AtomicUsize::new(failures),
            insert_attempts: AtomicUsize::new(0),
        }
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FlakyEventStore {
    async fn insert(&self, record: NewEventRecord) -> Result<EventRecord, EventStoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(EventStoreError::Unavailable {
                message: "simulated outage".to_string(),
            });
        }
        self.inner.insert(record).await
    }

    async fn query_by_cursor(
        &self,
        after: Option<EventId>,
        limit: usize,
    ) -> Result<CursorPage, EventStoreError> {
        self.inner.query_by_cursor(after, limit).await
    }

    async fn query_by_timestamp(
        &self,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        self.inner.query_by_timestamp(since, limit).await
    }

    async fn clear(&self) -> Result<u64, EventStoreError> {
        self.inner.clear().await
    }

    async fn health_check(&self) -> Result<StoreHealth, EventStoreError> {
        self.inner.health_check().await
    }
}

// ============================================================================
// Router construction
// ============================================================================

/// Router over the given store with default configuration
#[allow(dead_code)]
pub fn router_with_store(store: Arc<dyn EventStore>) -> Router {
    router_with_config(ServiceConfig::default(), store)
}

#[allow(dead_code)]
pub fn router_with_config(config: ServiceConfig, store: Arc<dyn EventStore>) -> Router {
    let metrics = ServiceMetrics::new().expect("metrics registry");
    let state = AppState::new(
        config,
        Arc::new(GithubWebhookProcessor::new()),
        Arc::new(StoreHealthChecker::new(store.clone())),
        store,
        metrics,
    );
    create_router(state)
}

#[allow(dead_code)]
pub fn memory_router() -> Router {
    router_with_store(Arc::new(InMemoryEventStore::new()))
}

#[allow(dead_code)]
pub async fn filesystem_router(data_dir: &Path) -> Router {
    let store = FilesystemEventStore::open(data_dir)
        .await
        .expect("open filesystem store");
    router_with_store(Arc::new(store))
}

// ============================================================================
// Request helpers
// ============================================================================

/// POST a delivery and return the status and JSON body
#[allow(dead_code)]
pub async fn post_webhook(router: &Router, kind: &str, payload: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-github-event", kind)
        .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .body(Body::from(payload.to_string()))
        .unwrap();

    send(router, request).await
}

/// GET a path and return the status and JSON body (`Null` when empty)
#[allow(dead_code)]
pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(router, request).await
}

#[allow(dead_code)]
pub async fn delete_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(router, request).await
}

#[allow(dead_code)]
async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Follow cursors from `start` until an empty batch; returns every id seen
/// in arrival order and the final cursor
#[allow(dead_code)]
pub async fn drain(router: &Router, start: Option<u64>, limit: usize) -> (Vec<u64>, Option<u64>) {
    let mut cursor = start;
    let mut seen = Vec::new();

    loop {
        let uri = match cursor {
            Some(after) => format!("/api/events?after={}&limit={}", after, limit),
            None => format!("/api/events?limit={}", limit),
        };
        let (status, body) = get_json(router, &uri).await;
        assert_eq!(status, StatusCode::OK);

        let events = body["events"].as_array().cloned().unwrap_or_default();
        if events.is_empty() {
            assert!(body["next_cursor"].is_null());
            return (seen, cursor);
        }

        seen.extend(events.iter().map(id_of));
        cursor = Some(id_of_str(&body["next_cursor"]));
    }
}

#[allow(dead_code)]
pub fn id_of(event: &Value) -> u64 {
    id_of_str(&event["id"])
}

#[allow(dead_code)]
fn id_of_str(value: &Value) -> u64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("expected a string id, got {}", value))
}

// ============================================================================
// Payload builders
// ============================================================================

#[allow(dead_code)]
pub fn push_payload(pusher: &str, git_ref: &str, timestamp: &str) -> Value {
    json!({
        "ref": git_ref,
        "before": "0000000000000000000000000000000000000000",
        "after": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
        "pusher": { "name": pusher, "email": "octocat@github.com" },
        "head_commit": {
            "id": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
            "message": "Fix all the bugs",
            "timestamp": timestamp,
            "author": { "name": "Monalisa Octocat", "email": "mona@github.com" }
        },
        "repository": { "full_name": "octocat/Hello-World" }
    })
}

#[allow(dead_code)]
pub fn pull_request_payload(action: &str, merged: bool, updated_at: &str) -> Value {
    json!({
        "action": action,
        "number": 1347,
        "pull_request": {
            "number": 1347,
            "state": if action == "closed" { "closed" } else { "open" },
            "merged": merged,
            "user": { "login": "octocat" },
            "head": { "ref": "new-topic" },
            "base": { "ref": "master" },
            "created_at": "2021-02-22T08:00:00Z",
            "updated_at": updated_at
        }
    })
}
