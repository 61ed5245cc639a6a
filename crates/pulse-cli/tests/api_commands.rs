//! Commands against a mocked API.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event_json(id: i64, title: &str, start: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "Волейбол",
        "start_datetime": start,
        "location": "Восточный кампус",
        "location_details": "спортзал",
        "event_type": "Спортивное",
        "roles_available": ["Участник"],
        "created_at": "2025-05-01T10:00:00",
        "updated_at": "2025-05-01T10:00:00",
        "author_id": 1
    })
}

fn user_json() -> serde_json::Value {
    json!({"id": 1, "username": "alice", "email": "a@b.com", "is_admin": false})
}

fn pulse(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.env("PULSE_HOME", home)
        .env("PULSE_API_URL", server.uri())
        .env_remove("PULSE_PASSWORD");
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_events_list_sends_filters_and_prints_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("type", "Спортивное"))
        .and(query_param("search", "турнир"))
        .and(query_param("status", "active"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([event_json(3, "Турнир", "2025-05-14T09:00:00")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    pulse(home.path(), &server)
        .args(["events", "list", "--type", "sports", "--search", "турнир"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Турнир"))
        .stdout(predicate::str::contains("Восточный кампус - спортзал"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_events_list_json_is_machine_readable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("status", "archive"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([event_json(5, "Квиз", "2025-04-01T09:00:00")])),
        )
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    let output = pulse(home.path(), &server)
        .args(["events", "list", "--archived", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let events: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(events[0]["id"], 5);
    assert_eq!(events[0]["event_type"], "Спортивное");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_stores_token_and_whoami_uses_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "T", "user": user_json()})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json()})))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    pulse(home.path(), &server)
        .args(["login", "--email", "a@b.com", "--password", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as alice"))
        .stderr(predicate::str::contains("Welcome, alice!"));
    assert_eq!(fs::read_to_string(home.path().join("token")).unwrap().trim(), "T");

    pulse(home.path(), &server)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("alice <a@b.com>"));

    pulse(home.path(), &server).arg("logout").assert().success();
    assert!(!home.path().join("token").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_reads_password_from_stdin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "from-stdin"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "T", "user": user_json()})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    pulse(home.path(), &server)
        .args(["login", "--email", "a@b.com"])
        .write_stdin("from-stdin\n")
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_shows_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Неверный пароль"})))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();

    pulse(home.path(), &server)
        .args(["login", "--email", "a@b.com", "--password", "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Login failed"));
    assert!(!home.path().join("token").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_admin_cannot_register_for_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": 2, "username": "root", "email": "r@b.com", "is_admin": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events/7/participate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    fs::write(home.path().join("token"), "ADMIN").unwrap();

    pulse(home.path(), &server)
        .args(["events", "participate", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Administrators cannot register"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_private_commands_require_sign_in() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    pulse(home.path(), &server)
        .args(["notifications", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_calendar_export_writes_month() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            event_json(1, "Турнир", "2025-05-14T09:00:00"),
            event_json(2, "Летний бал", "2025-06-20T09:00:00"),
        ])))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    let out = home.path().join("may.ics");

    pulse(home.path(), &server)
        .args(["calendar", "export", "--month", "2025-05", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 events"));

    let ics = fs::read_to_string(&out).unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("SUMMARY:Турнир"));
    assert!(!ics.contains("Летний бал"));
}
