use super::*;
use crate::event::EventAction;
use crate::timestamp::CanonicalTimestamp;
use tempfile::TempDir;

fn record() -> NewEventRecord {
    NewEventRecord {
        request_id: "1".to_string(),
        author: "erin".to_string(),
        action: EventAction::Push,
        from_branch: "main".to_string(),
        to_branch: "main".to_string(),
        timestamp: CanonicalTimestamp::parse("2024-01-29 10:00:00 UTC").unwrap(),
    }
}

#[test]
fn test_storage_config_defaults() {
    let config: StorageConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.backend, StorageBackend::Filesystem);
    assert_eq!(config.data_dir, PathBuf::from("./data/events"));

    let config: StorageConfig = serde_json::from_str(r#"{"backend":"memory"}"#).unwrap();
    assert_eq!(config.backend, StorageBackend::Memory);

    let config: StorageConfig =
        serde_json::from_str(r#"{"backend":"filesystem","data_dir":"/var/lib/hl"}"#).unwrap();
    assert_eq!(config.backend, StorageBackend::Filesystem);
}

#[tokio::test]
async fn test_opens_lazily_and_reuses_store() {
    let shared = SharedEventStore::new(StorageConfig {
        backend: StorageBackend::Memory,
        ..StorageConfig::default()
    });
    assert!(!shared.is_open());

    shared.insert(record()).await.unwrap();
    assert!(shared.is_open());

    let first = shared.get().await.unwrap();
    let second = shared.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(shared.health_check().await.unwrap().record_count, 1);
}

#[tokio::test]
async fn test_failed_open_is_retried() {
    let temp_dir = TempDir::new().unwrap();
    let blocked = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocked, b"file in the way").unwrap();

    let shared = SharedEventStore::new(StorageConfig {
        backend: StorageBackend::Filesystem,
        data_dir: blocked.clone(),
    });

    assert!(shared.get().await.is_err());
    assert!(!shared.is_open());

    std::fs::remove_file(&blocked).unwrap();
    let store = shared.get().await.unwrap();
    assert_eq!(store.health_check().await.unwrap().record_count, 0);
    assert!(shared.is_open());
}

#[tokio::test]
async fn test_from_store_wraps_existing() {
    let inner: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let shared = SharedEventStore::from_store(Arc::clone(&inner));

    assert!(shared.is_open());
    shared.insert(record()).await.unwrap();
    assert_eq!(inner.health_check().await.unwrap().record_count, 1);
}

#[tokio::test]
async fn test_default_backend_keeps_sequence_across_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        data_dir: temp_dir.path().join("events"),
        ..StorageConfig::default()
    };

    {
        let shared = SharedEventStore::new(config.clone());
        for _ in 0..3 {
            shared.insert(record()).await.unwrap();
        }
    }

    let restarted = SharedEventStore::new(config);
    let next = restarted.insert(record()).await.unwrap();
    assert_eq!(next.id, EventId::new(4));

    // A consumer holding the pre-restart cursor sees the new record
    let page = restarted.query_by_cursor(Some(EventId::new(3)), 10).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.next_cursor, Some(EventId::new(4)));
}
