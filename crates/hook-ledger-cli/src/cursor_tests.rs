use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_file_is_initial_state() {
    let dir = TempDir::new().unwrap();
    let file = CursorFile::new(dir.path().join("cursor.json"));

    let state = file.load().await.unwrap();

    assert_eq!(state, CursorState::default());
    assert_eq!(state.cursor, None);
}

#[tokio::test]
async fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let file = CursorFile::new(dir.path().join("nested").join("cursor.json"));

    file.save(EventId::new(42)).await.unwrap();
    let state = file.load().await.unwrap();

    assert_eq!(state.cursor, Some(EventId::new(42)));
    assert!(state.updated_at.is_some());
    assert!(!dir.path().join("nested").join("cursor.json.tmp").exists());
}

#[tokio::test]
async fn test_cursor_is_stored_as_string() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cursor.json");
    let file = CursorFile::new(&path);

    file.save(EventId::new(7)).await.unwrap();
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();

    assert_eq!(raw["cursor"], "7");
}

#[tokio::test]
async fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cursor.json");
    std::fs::write(&path, b"{not json").unwrap();

    let err = CursorFile::new(&path).load().await.expect_err("corrupt state");

    assert!(matches!(err, CliError::CursorState { .. }));
}

#[tokio::test]
async fn test_reset_removes_file() {
    let dir = TempDir::new().unwrap();
    let file = CursorFile::new(dir.path().join("cursor.json"));
    file.save(EventId::new(3)).await.unwrap();

    assert!(file.reset().await.unwrap());
    assert!(!file.reset().await.unwrap());
    assert_eq!(file.load().await.unwrap().cursor, None);
}

#[test]
fn test_default_path_names_state_file() {
    assert!(CursorFile::default_path().ends_with("cursor.json"));
}
