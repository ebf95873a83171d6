use super::*;
use crate::event::EventAction;
use crate::timestamp::CanonicalTimestamp;
use std::sync::Arc;

fn record(author: &str, timestamp: &str) -> NewEventRecord {
    NewEventRecord {
        request_id: format!("req-{author}"),
        author: author.to_string(),
        action: EventAction::Push,
        from_branch: "main".to_string(),
        to_branch: "main".to_string(),
        timestamp: CanonicalTimestamp::parse(timestamp).unwrap(),
    }
}

#[tokio::test]
async fn test_insert_assigns_increasing_ids() {
    let store = InMemoryEventStore::new();

    let first = store.insert(record("a", "2024-01-01 00:00:00 UTC")).await.unwrap();
    let second = store.insert(record("b", "2023-01-01 00:00:00 UTC")).await.unwrap();

    assert_eq!(first.id, EventId::new(1));
    assert_eq!(second.id, EventId::new(2));
    assert!(!store.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_inserts_get_distinct_ids() {
    let store = Arc::new(InMemoryEventStore::new());

    let mut handles = Vec::new();
    for i in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .insert(record(&format!("user{i}"), "2024-01-01 00:00:00 UTC"))
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 50);
    assert_eq!(ids.last(), Some(&EventId::new(50)));
}

#[tokio::test]
async fn test_cursor_query_ignores_timestamps() {
    let store = InMemoryEventStore::new();
    store.insert(record("late", "2030-01-01 00:00:00 UTC")).await.unwrap();
    store.insert(record("early", "2000-01-01 00:00:00 UTC")).await.unwrap();

    let page = store.query_by_cursor(Some(EventId::new(1)), 10).await.unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].author, "early");
    assert_eq!(page.next_cursor, Some(EventId::new(2)));
}

#[tokio::test]
async fn test_timestamp_query_filters_strictly_after() {
    let store = InMemoryEventStore::new();
    store.insert(record("a", "2024-01-01 10:00:00 UTC")).await.unwrap();
    store.insert(record("b", "2024-01-01 11:00:00 UTC")).await.unwrap();

    let records = store
        .query_by_timestamp(Some("2024-01-01 10:00:00 UTC"), 10)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].author, "b");
}

#[tokio::test]
async fn test_clear_keeps_sequence_running() {
    let store = InMemoryEventStore::new();
    store.insert(record("a", "2024-01-01 10:00:00 UTC")).await.unwrap();
    store.insert(record("b", "2024-01-01 11:00:00 UTC")).await.unwrap();

    assert_eq!(store.clear().await.unwrap(), 2);
    assert!(store.is_empty().await);

    let next = store.insert(record("c", "2024-01-01 12:00:00 UTC")).await.unwrap();
    assert_eq!(next.id, EventId::new(3));
}

#[tokio::test]
async fn test_unavailable_store_rejects_everything() {
    let store = InMemoryEventStore::new();
    store.set_available(false);

    let insert = store.insert(record("a", "2024-01-01 10:00:00 UTC")).await;
    assert!(matches!(insert, Err(EventStoreError::Unavailable { .. })));
    assert!(store.query_by_cursor(None, 10).await.is_err());
    assert!(store.query_by_timestamp(None, 10).await.is_err());
    assert!(store.health_check().await.is_err());

    store.set_available(true);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_health_reports_count_and_last_id() {
    let store = InMemoryEventStore::new();

    let empty = store.health_check().await.unwrap();
    assert_eq!(empty.record_count, 0);
    assert_eq!(empty.last_id, None);

    store.insert(record("a", "2024-01-01 10:00:00 UTC")).await.unwrap();
    let health = store.health_check().await.unwrap();
    assert!(health.reachable);
    assert_eq!(health.record_count, 1);
    assert_eq!(health.last_id, Some(EventId::new(1)));
}
