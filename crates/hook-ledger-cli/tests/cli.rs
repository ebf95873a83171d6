use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hook_ledger() -> Command {
    let mut cmd = Command::cargo_bin("hook-ledger").unwrap();
    cmd.env_remove("HOOK_LEDGER_URL")
        .env_remove("HOOK_LEDGER_STATE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    hook_ledger()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("events"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_completions_for_bash() {
    hook_ledger()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hook-ledger"));
}

#[test]
fn test_clear_without_confirmation_fails() {
    hook_ledger()
        .args(["events", "clear"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_reset_cursor_without_state() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("cursor.json");

    hook_ledger()
        .arg("--state-file")
        .arg(&state)
        .args(["events", "reset-cursor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved cursor"));
}

#[test]
fn test_unreachable_service_exit_code() {
    let dir = TempDir::new().unwrap();

    hook_ledger()
        .args(["--url", "http://127.0.0.1:9"])
        .arg("--state-file")
        .arg(dir.path().join("cursor.json"))
        .args(["events", "poll"])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_poll_prints_events_and_saves_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "events": [{
                "id": "12",
                "request_id": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
                "author": "octocat",
                "action": "PUSH",
                "from_branch": "main",
                "to_branch": "main",
                "timestamp": "2021-02-22 09:03:00 UTC"
            }],
            "count": 1,
            "latest_timestamp": "2021-02-22 09:03:00 UTC",
            "next_cursor": "12",
            "mode": "cursor"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let state = dir.path().join("cursor.json");

    hook_ledger()
        .args(["--url", &server.uri()])
        .arg("--state-file")
        .arg(&state)
        .args(["events", "poll"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[12] octocat pushed to main on 2021-02-22 09:03:00 UTC",
        ));

    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&state).unwrap()).unwrap();
    assert_eq!(saved["cursor"], "12");
}
