//! End-to-end runs against mocked Graph and LinkedIn endpoints

use chrono::Utc;
use libcyclecast::config::MediaPolicyKind;
use libcyclecast::platforms::mock::MockPlatform;
use libcyclecast::poster::create_platform;
use libcyclecast::{Config, PlatformKind, PostedLog, RunOutcome, Runner, Trigger};
use mockito::Matcher;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const CATALOG: &str = "\
id,pillar,content,hashtags,cta
p1,education,\"Sealed roofs last longer.\nAsk us how.\",#roofing #tips,Book an inspection today
p2,offers,Spring discount on gutter cleaning,#gutters,Reply to claim
p3,stories,A customer story from last week,#community,Read more on our page
";

fn workspace() -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("content.csv"), CATALOG).unwrap();
    let config = Config::default().with_base_dir(dir.path());
    (dir, config)
}

fn clear_credentials() {
    for var in [
        "FB_PAGE_ACCESS_TOKEN",
        "FB_PAGE_ID",
        "LINKEDIN_ACCESS_TOKEN",
        "LINKEDIN_USER_ID",
    ] {
        std::env::remove_var(var);
    }
}

#[tokio::test]
#[serial]
async fn test_facebook_run_posts_and_logs() {
    clear_credentials();
    let mut server = mockito::Server::new_async().await;
    let feed = server
        .mock("POST", "/v18.0/page-1/feed")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("access_token".into(), "fb-token".into()),
            Matcher::Regex("Sealed\\+roofs".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"id":"page-1_1001"}"#)
        .create_async()
        .await;

    let (dir, mut config) = workspace();
    config.facebook.api_base = server.url();
    config.facebook.page_id = Some("page-1".to_string());
    std::env::set_var("FB_PAGE_ACCESS_TOKEN", "fb-token");

    let platform = create_platform(PlatformKind::Facebook, &config).unwrap();
    let mut runner = Runner::new(config, platform, StdRng::seed_from_u64(3)).unwrap();
    let outcome = runner.run_once(Trigger::Manual).await.unwrap();

    let RunOutcome::Posted(item) = outcome else {
        panic!("expected a post, got {:?}", outcome);
    };
    assert_eq!(item.record_id, "p1");
    assert_eq!(item.remote_id, "page-1_1001");
    feed.assert_async().await;

    let raw = fs::read_to_string(dir.path().join("posted.json")).unwrap();
    let log: PostedLog = serde_json::from_str(&raw).unwrap();
    assert_eq!(log.posted_ids, vec!["p1"]);
    assert_eq!(log.last_post_id.as_deref(), Some("page-1_1001"));

    clear_credentials();
}

#[tokio::test]
#[serial]
async fn test_facebook_rejection_keeps_log_and_surfaces_message() {
    clear_credentials();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v18.0/page-1/feed")
        .with_status(400)
        .with_body(r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#)
        .create_async()
        .await;

    let (dir, mut config) = workspace();
    config.facebook.api_base = server.url();
    std::env::set_var("FB_PAGE_ACCESS_TOKEN", "stale");
    std::env::set_var("FB_PAGE_ID", "page-1");

    let platform = create_platform(PlatformKind::Facebook, &config).unwrap();
    let mut runner = Runner::new(config, platform, StdRng::seed_from_u64(3)).unwrap();
    let err = runner.run_once(Trigger::Manual).await.unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("Invalid OAuth access token."));
    assert!(!dir.path().join("posted.json").exists());

    clear_credentials();
}

#[tokio::test]
#[serial]
async fn test_facebook_photo_failure_falls_back_to_text() {
    clear_credentials();
    let mut server = mockito::Server::new_async().await;
    let photos = server
        .mock("POST", "/v18.0/page-1/photos")
        .with_status(400)
        .with_body(r#"{"error":{"message":"Invalid image URL"}}"#)
        .create_async()
        .await;
    let feed = server
        .mock("POST", "/v18.0/page-1/feed")
        .with_status(200)
        .with_body(r#"{"id":"page-1_2002"}"#)
        .create_async()
        .await;

    let (_dir, mut config) = workspace();
    config.facebook.api_base = server.url();
    config.facebook.page_id = Some("page-1".to_string());
    config.media.policy = MediaPolicyKind::Featured;
    config.media.every = 1;
    config.media.featured = Some("https://cdn.example.com/hero.png".to_string());
    std::env::set_var("FB_PAGE_ACCESS_TOKEN", "fb-token");

    let platform = create_platform(PlatformKind::Facebook, &config).unwrap();
    let mut runner = Runner::new(config, platform, StdRng::seed_from_u64(3)).unwrap();
    let RunOutcome::Posted(item) = runner.run_once(Trigger::Manual).await.unwrap() else {
        panic!("expected a post");
    };

    assert!(!item.media_attached);
    assert!(item.degraded.unwrap().contains("Invalid image URL"));
    photos.assert_async().await;
    feed.assert_async().await;

    clear_credentials();
}

#[tokio::test]
#[serial]
async fn test_linkedin_run_resolves_identity_and_uses_own_log() {
    clear_credentials();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/userinfo")
        .with_status(200)
        .with_body(r#"{"sub":"member-7"}"#)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/v2/ugcPosts")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "author": "urn:li:person:member-7"
        })))
        .with_status(201)
        .with_body(r#"{"id":"urn:li:share:1"}"#)
        .create_async()
        .await;

    let (dir, mut config) = workspace();
    config.linkedin.api_base = server.url();
    config.defaults.platform = PlatformKind::LinkedIn;
    std::env::set_var("LINKEDIN_ACCESS_TOKEN", "li-token");

    let platform = create_platform(PlatformKind::LinkedIn, &config).unwrap();
    let mut runner = Runner::new(config, platform, StdRng::seed_from_u64(3)).unwrap();
    let outcome = runner.run_once(Trigger::Manual).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Posted(ref item) if item.remote_id == "urn:li:share:1"));
    post.assert_async().await;
    assert!(dir.path().join("posted_linkedin.json").exists());
    assert!(!dir.path().join("posted.json").exists());

    clear_credentials();
}

#[tokio::test]
#[serial]
async fn test_linkedin_identity_failure_is_terminal() {
    clear_credentials();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", Matcher::Regex("^/v2/(userinfo|me)$".into()))
        .with_status(401)
        .with_body(r#"{"message":"Invalid access token"}"#)
        .expect(2)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/v2/ugcPosts")
        .expect(0)
        .create_async()
        .await;

    let (dir, mut config) = workspace();
    config.linkedin.api_base = server.url();
    config.defaults.platform = PlatformKind::LinkedIn;
    std::env::set_var("LINKEDIN_ACCESS_TOKEN", "li-token");

    let platform = create_platform(PlatformKind::LinkedIn, &config).unwrap();
    let mut runner = Runner::new(config, platform, StdRng::seed_from_u64(3)).unwrap();
    let err = runner.run_once(Trigger::Manual).await.unwrap_err();

    assert!(err.to_string().contains("Identity"));
    post.assert_async().await;
    assert!(!dir.path().join("posted_linkedin.json").exists());

    clear_credentials();
}

#[tokio::test]
async fn test_full_cycle_then_reset() {
    let (_dir, config) = workspace();
    let platform = MockPlatform::success("mock");
    let calls = platform.config();
    let mut runner = Runner::new(config, Box::new(platform), StdRng::seed_from_u64(11)).unwrap();

    let mut ids = Vec::new();
    for _ in 0..4 {
        if let RunOutcome::Posted(item) = runner.run_once(Trigger::Manual).await.unwrap() {
            ids.push(item.record_id);
        }
    }
    assert_eq!(ids, vec!["p1", "p2", "p3", "p1"]);

    // Every component appears exactly once, multi-line body included
    let first = &calls.posts()[0].text;
    assert_eq!(first.matches("Book an inspection today").count(), 1);
    assert_eq!(first.matches("#roofing #tips").count(), 1);
    assert_eq!(first.matches("Sealed roofs last longer.\nAsk us how.").count(), 1);

    runner.reset().unwrap();
    let status = runner.status(2).unwrap();
    assert_eq!(status.posted, 0);
    assert_eq!(status.remaining, 3);
    assert_eq!(status.last_post_time, None);
    assert_eq!(status.upcoming.len(), 2);
}

#[tokio::test]
async fn test_timer_run_after_long_gap_posts() {
    let (_dir, config) = workspace();
    let mut runner = Runner::new(
        config,
        Box::new(MockPlatform::success("mock")),
        StdRng::seed_from_u64(5),
    )
    .unwrap();
    runner
        .store()
        .save(&PostedLog {
            posted_ids: vec!["p1".to_string()],
            last_post_time: Some(Utc::now() - chrono::Duration::minutes(200)),
            last_post_id: Some("r1".to_string()),
        })
        .unwrap();

    let outcome = runner.run_once(Trigger::Timer).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Posted(ref item) if item.record_id == "p2"));
}

#[test]
fn test_legacy_naive_timestamp_log_is_readable() {
    let (dir, config) = workspace();
    fs::write(
        dir.path().join("posted.json"),
        r#"{"posted_ids":["p1","p2"],"last_post_time":"2024-03-01T09:15:42.123456"}"#,
    )
    .unwrap();

    let runner = Runner::offline(config, StdRng::seed_from_u64(0)).unwrap();
    let status = runner.status(5).unwrap();
    assert_eq!(status.posted, 2);
    assert_eq!(status.last_post_id, None);
    assert_eq!(
        status.last_post_time.unwrap().to_rfc3339(),
        "2024-03-01T09:15:42.123456+00:00"
    );
}
