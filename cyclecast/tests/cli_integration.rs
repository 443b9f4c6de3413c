//! Integration tests for the cyclecast binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATALOG: &str = "\
id,pillar,content,hashtags,cta
1,tips,Clean your gutters twice a year,#gutters,Book a visit
2,news,We now serve the north side,#local,Call us
3,offers,Ten percent off this month,#deal,Reply to claim
";

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Temp dir with a catalog and a config file; returns the config path
fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("content.csv"), CATALOG).unwrap();

    let config_path = temp_dir.path().join("config.toml");
    let config = format!(
        "[content]\npath = \"{}\"\n{}",
        escape_path_for_toml(&temp_dir.path().join("content.csv").to_string_lossy()),
        extra
    );
    fs::write(&config_path, config).unwrap();

    (temp_dir, config_path)
}

fn cyclecast(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cyclecast").unwrap();
    cmd.arg("--config")
        .arg(config)
        .env_remove("CYCLECAST_CONFIG")
        .env_remove("CYCLECAST_TRIGGER")
        .env_remove("GITHUB_ACTIONS")
        .env_remove("GITHUB_EVENT_NAME")
        .env_remove("FB_PAGE_ACCESS_TOKEN")
        .env_remove("FB_PAGE_ID")
        .env_remove("LINKEDIN_ACCESS_TOKEN")
        .env_remove("LINKEDIN_USER_ID");
    cmd
}

fn write_log(dir: &Path, file: &str, body: &str) {
    fs::write(dir.join(file), body).unwrap();
}

#[test]
fn test_help_documents_commands_and_exit_codes() {
    let mut cmd = Command::cargo_bin("cyclecast").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("reset"))
        .stdout(predicate::str::contains("EXIT CODES"))
        .stdout(predicate::str::contains("--manual"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("cyclecast").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cyclecast"));
}

#[test]
fn test_preview_shows_next_posts_without_writing() {
    let (dir, config) = setup_test_env("");
    write_log(
        dir.path(),
        "posted.json",
        r#"{"posted_ids":["1"],"last_post_time":null,"last_post_id":null}"#,
    );
    let before = fs::read_to_string(dir.path().join("posted.json")).unwrap();

    cyclecast(&config)
        .args(["preview", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next 2 posts would be"))
        .stdout(predicate::str::contains("We now serve the north side"))
        .stdout(predicate::str::contains("Ten percent off this month"))
        .stdout(predicate::str::contains("Clean your gutters").not());

    let after = fs::read_to_string(dir.path().join("posted.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_preview_needs_no_credentials() {
    let (_dir, config) = setup_test_env("");
    cyclecast(&config)
        .args(["--platform", "linkedin", "preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next 3 posts would be"));
}

#[test]
fn test_status_text() {
    let (dir, config) = setup_test_env("");
    write_log(
        dir.path(),
        "posted.json",
        r#"{"posted_ids":["1","2"],"last_post_time":"2024-05-01T10:00:00Z","last_post_id":"page_42"}"#,
    );

    cyclecast(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total posts:    3"))
        .stdout(predicate::str::contains("Remaining:      1"))
        .stdout(predicate::str::contains("page_42"));
}

#[test]
fn test_status_after_full_cycle_lists_next_cycle() {
    let (dir, config) = setup_test_env("");
    write_log(
        dir.path(),
        "posted.json",
        r#"{"posted_ids":["1","2","3"],"last_post_time":null,"last_post_id":null}"#,
    );

    cyclecast(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Remaining:      0"))
        .stdout(predicate::str::contains("Cycle complete"))
        .stdout(predicate::str::contains("  1 [tips]"));
}

#[test]
fn test_status_json() {
    let (dir, config) = setup_test_env("");
    write_log(
        dir.path(),
        "posted_linkedin.json",
        r#"{"posted_ids":["1"],"last_post_time":null,"last_post_id":null}"#,
    );

    let output = cyclecast(&config)
        .args(["--platform", "linkedin", "status", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["platform"], "linkedin");
    assert_eq!(json["total"], 3);
    assert_eq!(json["posted"], 1);
    assert_eq!(json["remaining"], 2);
    assert_eq!(json["upcoming"][0]["id"], "2");
}

#[test]
fn test_status_invalid_format_exit_code() {
    let (_dir, config) = setup_test_env("");
    cyclecast(&config)
        .args(["status", "--format", "xml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid format"));
}

#[test]
fn test_reset_clears_log() {
    let (dir, config) = setup_test_env("");
    write_log(
        dir.path(),
        "posted.json",
        r#"{"posted_ids":["1","2","3"],"last_post_time":"2024-05-01T10:00:00Z","last_post_id":"x"}"#,
    );

    cyclecast(&config)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("Posted log cleared"));

    let log: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("posted.json")).unwrap())
            .unwrap();
    assert_eq!(log["posted_ids"], serde_json::json!([]));
    assert!(log["last_post_time"].is_null());
    assert!(log["last_post_id"].is_null());
}

#[test]
fn test_missing_credentials_exit_code_and_log_untouched() {
    let (dir, config) = setup_test_env("");

    cyclecast(&config)
        .arg("--manual")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("FB_PAGE_ACCESS_TOKEN"));

    assert!(!dir.path().join("posted.json").exists());
}

#[test]
fn test_invalid_config_exit_code() {
    let (_dir, config) = setup_test_env(
        "[schedule]\nmin_interval_minutes = 300\nmax_interval_minutes = 100\n",
    );
    cyclecast(&config).arg("status").assert().code(2);
}

#[test]
fn test_missing_catalog_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[content]\npath = \"nope.csv\"\n").unwrap();

    cyclecast(&config_path)
        .arg("preview")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.csv"));
}

#[test]
fn test_invalid_trigger_exit_code() {
    let (_dir, config) = setup_test_env("");
    cyclecast(&config)
        .env("CYCLECAST_TRIGGER", "whenever")
        .arg("post")
        .assert()
        .code(3);
}

#[test]
fn test_unknown_platform_rejected() {
    let (_dir, config) = setup_test_env("");
    cyclecast(&config)
        .args(["--platform", "myspace", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown platform"));
}

#[test]
fn test_manual_post_to_facebook() {
    let mut server = mockito::Server::new();
    let feed = server
        .mock("POST", "/v18.0/page-9/feed")
        .match_body(mockito::Matcher::UrlEncoded(
            "access_token".into(),
            "fb-token".into(),
        ))
        .with_status(200)
        .with_body(r#"{"id":"page-9_77"}"#)
        .create();

    let (dir, config) = setup_test_env(&format!(
        "[facebook]\napi_base = \"{}\"\npage_id = \"page-9\"\n",
        server.url()
    ));

    cyclecast(&config)
        .env("FB_PAGE_ACCESS_TOKEN", "fb-token")
        .arg("--manual")
        .assert()
        .success()
        .stdout(predicate::str::contains("Posted [tips] 1 as page-9_77"));

    feed.assert();
    let log: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("posted.json")).unwrap())
            .unwrap();
    assert_eq!(log["posted_ids"], serde_json::json!(["1"]));
    assert_eq!(log["last_post_id"], "page-9_77");
}

#[test]
fn test_timer_run_not_yet_time_is_success() {
    let server = mockito::Server::new();
    let (dir, config) = setup_test_env(&format!(
        "[facebook]\napi_base = \"{}\"\npage_id = \"page-9\"\n",
        server.url()
    ));
    let recent = chrono::Utc::now().to_rfc3339();
    write_log(
        dir.path(),
        "posted.json",
        &format!(
            r#"{{"posted_ids":["1"],"last_post_time":"{}","last_post_id":"r1"}}"#,
            recent
        ),
    );
    let before = fs::read_to_string(dir.path().join("posted.json")).unwrap();

    cyclecast(&config)
        .env("FB_PAGE_ACCESS_TOKEN", "fb-token")
        .env("CYCLECAST_TRIGGER", "timer")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not time to post yet"));

    assert_eq!(
        before,
        fs::read_to_string(dir.path().join("posted.json")).unwrap()
    );
}

#[test]
fn test_failed_post_exits_nonzero() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/v18.0/page-9/feed")
        .with_status(500)
        .with_body(r#"{"error":{"message":"Service temporarily unavailable"}}"#)
        .create();

    let (dir, config) = setup_test_env(&format!(
        "[facebook]\napi_base = \"{}\"\npage_id = \"page-9\"\n",
        server.url()
    ));

    cyclecast(&config)
        .env("FB_PAGE_ACCESS_TOKEN", "fb-token")
        .arg("--manual")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Service temporarily unavailable"));

    assert!(!dir.path().join("posted.json").exists());
}

#[test]
fn test_batch_posts_in_order() {
    let mut server = mockito::Server::new();
    let feed = server
        .mock("POST", "/v18.0/page-9/feed")
        .with_status(200)
        .with_body(r#"{"id":"page-9_1"}"#)
        .expect(2)
        .create();

    let (dir, config) = setup_test_env(&format!(
        "[facebook]\napi_base = \"{}\"\npage_id = \"page-9\"\n",
        server.url()
    ));

    cyclecast(&config)
        .env("FB_PAGE_ACCESS_TOKEN", "fb-token")
        .args(["batch", "-n", "2", "--delay", "0s"])
        .assert()
        .success();

    feed.assert();
    let log: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("posted.json")).unwrap())
            .unwrap();
    assert_eq!(log["posted_ids"], serde_json::json!(["1", "2"]));
}

#[test]
fn test_linkedin_schedule_not_supported() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/v2/userinfo")
        .with_status(200)
        .with_body(r#"{"sub":"m1"}"#)
        .create();

    let (dir, config) = setup_test_env(&format!(
        "[linkedin]\napi_base = \"{}\"\n",
        server.url()
    ));

    cyclecast(&config)
        .env("LINKEDIN_ACCESS_TOKEN", "li-token")
        .args(["--platform", "linkedin", "schedule", "--in", "2h"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not support scheduled posts"));

    assert!(!dir.path().join("posted_linkedin.json").exists());
}
