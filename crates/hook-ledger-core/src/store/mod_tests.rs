use super::*;
use crate::event::EventAction;

fn stored(id: u64, timestamp: &str) -> EventRecord {
    NewEventRecord {
        request_id: id.to_string(),
        author: format!("author{id}"),
        action: EventAction::Merge,
        from_branch: "topic".to_string(),
        to_branch: "main".to_string(),
        timestamp: CanonicalTimestamp::parse(timestamp).unwrap(),
    }
    .with_id(EventId::new(id))
}

fn ids(records: &[EventRecord]) -> Vec<u64> {
    records.iter().map(|r| r.id.as_u64()).collect()
}

/// Insertion order with timestamps that collide and invert
fn skewed() -> Vec<EventRecord> {
    vec![
        stored(1, "2024-01-29 10:00:00 UTC"),
        stored(2, "2024-01-29 09:00:00 UTC"),
        stored(3, "2024-01-29 10:00:00 UTC"),
        stored(4, "2024-01-29 08:00:00 UTC"),
        stored(5, "2024-01-29 11:00:00 UTC"),
    ]
}

#[test]
fn test_display_order_is_timestamp_then_id_descending() {
    let mut records = skewed();
    sort_for_display(&mut records);
    assert_eq!(ids(&records), vec![5, 3, 1, 2, 4]);
}

#[test]
fn test_cursor_page_selects_by_id_then_sorts_for_display() {
    let records = skewed();

    let page = page_from_ascending(&records, Some(EventId::new(1)), 2);

    // ids 2 and 3 are the next two inserted; display puts 3 first
    assert_eq!(ids(&page.records), vec![3, 2]);
    assert_eq!(page.next_cursor, Some(EventId::new(3)));
}

#[test]
fn test_cursor_page_without_cursor_starts_at_beginning() {
    let records = skewed();
    let page = page_from_ascending(&records, None, 3);

    let mut selected = ids(&page.records);
    selected.sort();
    assert_eq!(selected, vec![1, 2, 3]);
}

#[test]
fn test_cursor_page_past_end_is_empty() {
    let records = skewed();
    let page = page_from_ascending(&records, Some(EventId::new(5)), 10);

    assert!(page.records.is_empty());
    assert_eq!(page.next_cursor, None);
}

#[test]
fn test_cursor_query_is_repeatable() {
    let records = skewed();
    let first = page_from_ascending(&records, Some(EventId::new(2)), 10);
    let second = page_from_ascending(&records, Some(EventId::new(2)), 10);
    assert_eq!(first, second);
}

#[test]
fn test_timestamp_window_string_comparison() {
    let records = skewed();

    let window = timestamp_window(&records, Some("2024-01-29 09:00:00 UTC"), 10);
    assert_eq!(ids(&window), vec![5, 3, 1]);

    let capped = timestamp_window(&records, None, 2);
    assert_eq!(ids(&capped), vec![5, 3]);

    let blank = timestamp_window(&records, Some("  "), 10);
    assert_eq!(blank.len(), 5);
}

#[test]
fn test_timestamp_window_skips_skewed_insert() {
    let records = skewed();

    // A legacy poller that saw id 1 at 10:00 never receives id 2 or 4
    let window = timestamp_window(&records, Some("2024-01-29 10:00:00 UTC"), 10);
    assert_eq!(ids(&window), vec![5]);
}

#[test]
fn test_error_transience() {
    assert!(EventStoreError::Unavailable { message: String::new() }.is_transient());
    assert!(EventStoreError::Io { message: String::new() }.is_transient());
    assert!(!EventStoreError::Serialization { message: String::new() }.is_transient());
    assert!(!EventStoreError::Corrupted { message: String::new() }.is_transient());
}

mod fetch_tests {
    use super::*;
    use crate::adapters::InMemoryEventStore;

    #[tokio::test]
    async fn test_fetch_timestamp_mode_reports_max_id() {
        let store = InMemoryEventStore::new();
        for record in skewed() {
            let new = NewEventRecord {
                request_id: record.request_id,
                author: record.author,
                action: record.action,
                from_branch: record.from_branch,
                to_branch: record.to_branch,
                timestamp: record.timestamp,
            };
            store.insert(new).await.unwrap();
        }

        let batch = store
            .fetch(
                EventQuery::Timestamp {
                    since: Some("2024-01-29 09:30:00 UTC".to_string()),
                },
                10,
            )
            .await
            .unwrap();

        assert_eq!(batch.mode, QueryMode::Timestamp);
        assert_eq!(ids(&batch.records), vec![5, 3, 1]);
        assert_eq!(batch.next_cursor, Some(EventId::new(5)));
        assert_eq!(
            batch.latest_timestamp().map(|t| t.as_str()),
            Some("2024-01-29 11:00:00 UTC")
        );
    }

    #[tokio::test]
    async fn test_fetch_cursor_mode() {
        let store = InMemoryEventStore::new();
        let batch = store
            .fetch(EventQuery::Cursor { after: None }, 10)
            .await
            .unwrap();

        assert_eq!(batch.mode, QueryMode::Cursor);
        assert!(batch.records.is_empty());
        assert_eq!(batch.latest_timestamp(), None);
    }
}
