use super::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn events_body(ids: &[u64]) -> serde_json::Value {
    let events: Vec<serde_json::Value> = ids
        .iter()
        .rev()
        .map(|id| {
            json!({
                "id": id.to_string(),
                "request_id": format!("commit-{}", id),
                "author": "octocat",
                "action": "PUSH",
                "from_branch": "main",
                "to_branch": "main",
                "timestamp": format!("2021-02-22 09:00:{:02} UTC", id),
            })
        })
        .collect();

    json!({
        "status": "success",
        "count": events.len(),
        "latest_timestamp": events.first().map(|e| e["timestamp"].clone()),
        "next_cursor": ids.iter().max().map(|id| id.to_string()),
        "mode": "cursor",
        "events": events,
    })
}

#[test]
fn test_rejects_non_http_url() {
    let err = EventsClient::new("localhost:8080").expect_err("scheme is required");
    assert!(matches!(err, CliError::InvalidArgument { .. }));
}

#[test]
fn test_trailing_slash_is_trimmed() {
    let client = EventsClient::new("http://localhost:8080/").unwrap();
    assert_eq!(client.base_url(), "http://localhost:8080");
}

#[tokio::test]
async fn test_poll_sends_cursor_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("after", "3"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body(&[4, 5])))
        .expect(1)
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    let batch = client
        .poll(Some(EventId::new(3)), Some(2))
        .await
        .expect("poll succeeds");

    assert_eq!(batch.count, 2);
    assert_eq!(batch.next_cursor, Some(EventId::new(5)));
    assert_eq!(batch.events[0].id, EventId::new(5));
}

#[tokio::test]
async fn test_first_poll_omits_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    let batch = client.poll(None, None).await.expect("poll succeeds");

    assert_eq!(batch.count, 0);
    assert_eq!(batch.next_cursor, None);
}

#[tokio::test]
async fn test_list_since_uses_timestamp_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("since", "2021-02-22 09:00:00 UTC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body(&[1])))
        .expect(1)
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    let batch = client
        .list_since(Some("2021-02-22 09:00:00 UTC"), None)
        .await
        .expect("list succeeds");

    assert_eq!(batch.count, 1);
}

#[tokio::test]
async fn test_service_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "status": "error",
            "message": "Failed to retrieve events",
            "error": "Event store unavailable: disk gone",
        })))
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    let err = client.poll(None, None).await.expect_err("service failed");

    match err {
        CliError::Service { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "Failed to retrieve events");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_clear_returns_deleted_count() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "success", "deleted": 7})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    assert_eq!(client.clear().await.unwrap(), 7);
}

#[tokio::test]
async fn test_deep_health_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health/deep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": "2021-02-22T09:00:00Z",
            "version": "0.1.0",
            "checks": {
                "event_store": {
                    "healthy": true,
                    "message": "3 event records stored, last id 3",
                    "duration_ms": 0
                }
            }
        })))
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    let report = client.health(true).await.unwrap();

    assert!(report.healthy);
    assert_eq!(report.version.as_deref(), Some("0.1.0"));
    assert!(report.checks["event_store"].healthy);
}

#[tokio::test]
async fn test_unhealthy_service_is_reported_not_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = EventsClient::new(server.uri()).unwrap();
    let report = client.health(false).await.unwrap();

    assert!(!report.healthy);
    assert_eq!(report.status_code, 503);
}
