use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_in_home() -> TempDir {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("session.json"), r#"{"token":"tok-123"}"#).unwrap();
    home
}

fn dermascan(home: &Path, api_url: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("dermascan");
    cmd.env("DERMASCAN_HOME", home)
        .env_remove("DERMASCAN_API_URL")
        .env_remove("DERMASCAN_LOG")
        .args(["--api-url", api_url]);
    cmd
}

async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/profile/"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "dr.house",
            "email": "house@ppth.example",
            "first_name": "Gregory",
            "last_name": "House"
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_update_resends_untouched_fields() {
    let server = MockServer::start().await;
    let home = signed_in_home();
    mount_profile(&server).await;

    Mock::given(method("PUT"))
        .and(path("/profile/update/"))
        .and(body_json(json!({
            "username": "dr.house",
            "email": "house@ppth.example",
            "first_name": "Greg",
            "last_name": "House"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "dr.house",
            "email": "house@ppth.example",
            "first_name": "Greg",
            "last_name": "House"
        })))
        .expect(1)
        .mount(&server)
        .await;

    dermascan(home.path(), &server.uri())
        .args(["profile", "update", "--first-name", "Greg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Greg House"))
        .stderr(predicate::str::contains("✓ Profile updated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_password_short_sends_nothing() {
    let server = MockServer::start().await;
    let home = signed_in_home();

    Mock::given(method("PUT"))
        .and(path("/profile/password/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    dermascan(home.path(), &server.uri())
        .args([
            "profile",
            "password",
            "--current",
            "old-secret",
            "--new",
            "short",
            "--confirm",
            "short",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_password_change() {
    let server = MockServer::start().await;
    let home = signed_in_home();

    Mock::given(method("PUT"))
        .and(path("/profile/password/"))
        .and(body_json(json!({
            "current_password": "old-secret",
            "new_password": "new-secret"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    dermascan(home.path(), &server.uri())
        .args(["profile", "password", "--current", "old-secret", "--new", "new-secret"])
        .write_stdin("new-secret\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("✓ Password updated"));
}

#[test]
fn test_profile_show_requires_login() {
    let home = TempDir::new().unwrap();

    dermascan(home.path(), "http://127.0.0.1:9")
        .args(["profile", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}
