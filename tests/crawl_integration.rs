//! End-to-end crawl tests driven against a mock HTTP server.
//!
//! Each test spins up a `wiremock::MockServer`, points a `Controller` at
//! it as the sole allowed domain, runs the worker pool to completion, and
//! inspects the resulting frontier/visited/pages rows — the same style
//! the reference crate's `tests/integration/crawl_tests.rs` uses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use webtrawl::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use webtrawl::controller::Controller;
use webtrawl::storage::{SqliteStore, Store};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn test_config(db_path: &std::path::Path, blob_dir: &std::path::Path, fetch_timeout_secs: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            fetch_timeout_secs,
            max_retries: 2,
            stuck_threshold_secs: 3600,
            shutdown_grace_secs: 2,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            blob_dir: blob_dir.to_string_lossy().into_owned(),
        },
    }
}

fn host_of(base_url: &str) -> String {
    url::Url::parse(base_url)
        .unwrap()
        .host_str()
        .unwrap()
        .to_string()
}

/// Polls `store.stats()` until no rows are pending or in-progress, or the
/// deadline passes.
async fn wait_for_idle(store: &SqliteStore, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let stats = store.stats().unwrap();
        if stats.pending == 0 && stats.in_progress == 0 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("crawl did not reach idle within {timeout:?}; stats = {stats:?}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn single_origin_depth_crawl_visits_seed_and_its_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><head><title>Home</title></head><body>
                        <a href="{base}/a">A</a>
                        <a href="{base}/b">B</a>
                    </body></html>"#
                )),
        )
        .mount(&mock_server)
        .await;

    for child in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(child))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(format!(
                        r#"<html><body><a href="{base}/">Home</a></body></html>"#
                    )),
            )
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let blob_dir = dir.path().join("pages");
    let config = test_config(&db_path, &blob_dir, 5);

    let store = SqliteStore::new(&db_path).unwrap();
    let mut controller = Controller::new(config, true);
    controller.add_seed(&store, &format!("{base}/")).unwrap();

    controller.start(2, 2).unwrap();
    wait_for_idle(&store, Duration::from_secs(10)).await;
    controller.stop().await;

    let stats = store.stats().unwrap();
    assert_eq!(stats.done, 3, "expected /, /a, /b all done, got {stats:?}");
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn identical_bodies_dedup_to_one_blob() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let shared_body = r#"<html><head><title>Shared</title></head><body>same content</body></html>"#;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><body><a href="{base}/a">A</a><a href="{base}/b">B</a></body></html>"#
                )),
        )
        .mount(&mock_server)
        .await;

    for child in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(child))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(shared_body),
            )
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let blob_dir = dir.path().join("pages");
    let config = test_config(&db_path, &blob_dir, 5);

    let store = SqliteStore::new(&db_path).unwrap();
    let mut controller = Controller::new(config, true);
    controller.add_seed(&store, &format!("{base}/")).unwrap();

    controller.start(2, 1).unwrap();
    wait_for_idle(&store, Duration::from_secs(10)).await;
    controller.stop().await;

    let hash = webtrawl::content::ContentStore::hash_of(shared_body.as_bytes());
    let path_from_store = store.get_page_by_hash(&hash).unwrap();
    assert!(path_from_store.is_some());

    let blob_files: Vec<_> = std::fs::read_dir(&blob_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&hash))
        .collect();
    assert_eq!(blob_files.len(), 1, "expected exactly one blob file for the shared hash");
}

#[tokio::test]
async fn robots_disallowed_path_is_never_fetched_and_marked_failed() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><body><a href="{base}/private">Secret</a></body></html>"#
                )),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should never be fetched"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let blob_dir = dir.path().join("pages");
    let config = test_config(&db_path, &blob_dir, 5);

    let store = SqliteStore::new(&db_path).unwrap();
    let mut controller = Controller::new(config, true);
    controller.add_seed(&store, &format!("{base}/")).unwrap();

    controller.start(2, 1).unwrap();
    wait_for_idle(&store, Duration::from_secs(10)).await;
    controller.stop().await;

    let stats = store.stats().unwrap();
    assert_eq!(stats.done, 1, "only the seed should be done");
    assert_eq!(stats.failed, 1, "/private should be marked failed");

    // wiremock verifies the .expect(0) assertion on drop.
}

#[tokio::test]
async fn out_of_domain_links_are_never_inserted() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<html><body><a href="https://off-domain.test/x">Away</a></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let blob_dir = dir.path().join("pages");
    let config = test_config(&db_path, &blob_dir, 5);

    let store = SqliteStore::new(&db_path).unwrap();
    let mut controller = Controller::new(config, true);
    controller.add_seed(&store, &format!("{base}/")).unwrap();

    controller.start(1, 2).unwrap();
    wait_for_idle(&store, Duration::from_secs(10)).await;
    controller.stop().await;

    let stats = store.stats().unwrap();
    assert_eq!(stats.done, 1, "only the seed should ever be inserted");

    let seed_host = host_of(&base);
    assert_ne!(seed_host, "off-domain.test");
}

/// A non-2xx response is still a completed fetch, not a failure: it lands
/// in `done` with its status code recorded, never retried as `failed`.
#[tokio::test]
async fn non_2xx_response_is_recorded_as_done_not_failed() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404).insert_header("content-type", "text/html"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let blob_dir = dir.path().join("pages");
    let config = test_config(&db_path, &blob_dir, 5);

    let store = SqliteStore::new(&db_path).unwrap();
    let mut controller = Controller::new(config, true);
    controller.add_seed(&store, &format!("{base}/")).unwrap();

    controller.start(1, 0).unwrap();
    wait_for_idle(&store, Duration::from_secs(10)).await;
    controller.stop().await;

    let stats = store.stats().unwrap();
    assert_eq!(stats.done, 1, "a 404 response is a completed fetch, not a failure");
    assert_eq!(stats.failed, 0);
}

/// Responds to the first `fail_times` requests with a body delayed long
/// enough to blow the client's fetch timeout (a genuine `NetworkError`,
/// not an HTTP status), then answers instantly afterward.
struct FlakyThenOk {
    calls: AtomicUsize,
    fail_times: usize,
}

impl Respond for FlakyThenOk {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_times {
            ResponseTemplate::new(200).set_delay(Duration::from_millis(1500))
        } else {
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>recovered</body></html>")
        }
    }
}

/// A URL that times out twice and then succeeds must end up `done`, having
/// been requeued (not failed) through the two transient network errors, and
/// its `retries` column must reflect all three claims.
#[tokio::test]
async fn transient_network_errors_are_retried_then_succeed() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(FlakyThenOk {
            calls: AtomicUsize::new(0),
            fail_times: 2,
        })
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let blob_dir = dir.path().join("pages");
    let config = test_config(&db_path, &blob_dir, 1);

    let store = SqliteStore::new(&db_path).unwrap();
    let mut controller = Controller::new(config, true);
    let seed = format!("{base}/");
    controller.add_seed(&store, &seed).unwrap();

    controller.start(1, 0).unwrap();
    wait_for_idle(&store, Duration::from_secs(10)).await;
    controller.stop().await;

    let stats = store.stats().unwrap();
    assert_eq!(stats.done, 1, "the URL must end up done after surviving two timeouts");
    assert_eq!(stats.failed, 0);

    let retries: i64 = rusqlite::Connection::open(&db_path)
        .unwrap()
        .query_row("SELECT retries FROM frontier WHERE url = ?1", [&seed], |row| row.get(0))
        .unwrap();
    assert_eq!(retries, 3, "claim_next must have bumped retries on all three claims");
}
