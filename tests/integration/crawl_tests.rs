//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end: fetch, extract, events, persistence.

use seedcrawl::config::{
    Config, CrawlerConfig, EventsConfig, OutputConfig, OutputFormat, SiteConfig, UserAgentConfig,
};
use seedcrawl::crawler::{Controller, StopSignal};
use seedcrawl::output::{CrawlEvent, EventSink, MemorySink};
use seedcrawl::storage::{persist_batch, read_records, JsonLinesSink, SqliteSink};
use seedcrawl::{CrawlBatch, FailureKind, TopicMap};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOG_PAGE: &str = r#"<html><head><title>Dog - Wiki</title></head><body>
<div id="nav"><a href="/wiki/Canine">Canine</a><a href="/wiki/Talk:Dog">Talk</a></div>
<h1 id="firstHeading">Dog</h1>
<div id="mw-content-text"><p>Dogs are mammals.<sup>[1]</sup></p></div>
<div id="mw-normal-catlinks"><ul><li><a href="/wiki/Category:Mammals">Mammals</a></li></ul></div>
</body></html>"#;

/// Creates a test configuration with short timings
fn create_test_config(delay: f64, concurrency: u32, retries: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            rate_limit_delay: delay,
            request_timeout: 5,
            max_concurrent_pages: concurrency,
            max_retries: retries,
            retry_backoff: 10, // Very short for testing
        },
        user_agent: UserAgentConfig::default(),
        site: SiteConfig {
            origin: "https://example.org".to_string(),
            ..SiteConfig::default()
        },
        output: OutputConfig {
            format: OutputFormat::Jsonl,
            path: "unused.jsonl".to_string(),
        },
        events: EventsConfig::default(),
        topics: vec![],
    }
}

fn simple_page(title: &str) -> String {
    format!(
        r#"<html><body><h1 id="firstHeading">{}</h1><div id="mw-content-text"><p>About {}.</p></div></body></html>"#,
        title, title
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn run(config: &Config, topics: &TopicMap) -> (CrawlBatch, Arc<MemorySink>) {
    let events = Arc::new(MemorySink::new());
    let controller = Controller::new(config, events.clone(), StopSignal::new())
        .expect("Failed to build controller");
    let batch = controller.run(topics).await;
    (batch, events)
}

#[tokio::test]
async fn test_crawl_extracts_record() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/wiki/Dog", DOG_PAGE.to_string()).await;

    let url = format!("{}/wiki/Dog", mock_server.uri());
    let topics = TopicMap::from_pairs([("Dog", url.as_str())]).unwrap();
    let config = create_test_config(0.0, 1, 0);

    let (batch, events) = run(&config, &topics).await;

    assert!(batch.failures.is_empty(), "Unexpected failures: {:?}", batch.failures);
    assert_eq!(batch.records.len(), 1);

    let record = &batch.records[0];
    assert_eq!(record.title(), "Dog");
    assert_eq!(record.content(), "Dogs are mammals.");
    assert_eq!(record.categories(), &["Mammals".to_string()]);
    assert_eq!(record.links(), &["https://example.org/wiki/Canine".to_string()]);
    assert_eq!(record.topic(), "Dog");
    assert_eq!(record.source_url(), url);
    assert_eq!(record.content_length(), "Dogs are mammals.".len());
    assert!(record.success());

    let events = events.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        CrawlEvent::PageCompleted { success: true, attempts: 1, .. }
    ));
    assert!(matches!(
        &events[1],
        CrawlEvent::RunCompleted { fetched: 1, failed: 0, skipped: 0, stopped: false, .. }
    ));
}

#[tokio::test]
async fn test_http_404_becomes_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Nonexistent"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<h1 id=\"firstHeading\">Nope</h1>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/wiki/Nonexistent", mock_server.uri());
    let topics = TopicMap::from_pairs([("Ghost", url.as_str())]).unwrap();

    // Retries are enabled but a 404 is permanent
    let (batch, _) = run(&create_test_config(0.0, 1, 3), &topics).await;

    assert!(batch.records.is_empty());
    assert_eq!(batch.failures.len(), 1);

    let failure = &batch.failures[0];
    assert_eq!(failure.url, url);
    assert_eq!(failure.topic, "Ghost");
    assert_eq!(failure.kind, FailureKind::HttpStatus);
    assert!(failure.error_detail.contains("404"));
    assert_eq!(failure.attempts, 1);
}

#[tokio::test]
async fn test_failure_does_not_affect_other_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/wiki/Cat", simple_page("Cat")).await;
    mount_page(&mock_server, "/wiki/Horse", simple_page("Horse")).await;
    Mock::given(method("GET"))
        .and(path("/wiki/Broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let topics = TopicMap::from_pairs([
        ("Cat", format!("{}/wiki/Cat", base)),
        ("Broken", format!("{}/wiki/Broken", base)),
        ("Horse", format!("{}/wiki/Horse", base)),
    ])
    .unwrap();

    let (batch, _) = run(&create_test_config(0.0, 2, 0), &topics).await;

    let titles: Vec<_> = batch.records.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Cat", "Horse"]);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].topic, "Broken");
    assert_eq!(batch.summary.attempted, 3);
    assert_eq!(batch.summary.fetched, 2);
    assert_eq!(batch.summary.failed, 1);
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    for name in ["A", "B", "C"] {
        mount_page(&mock_server, &format!("/wiki/{}", name), simple_page(name)).await;
    }

    let topics = TopicMap::from_pairs([
        ("A", format!("{}/wiki/A", base)),
        ("B", format!("{}/wiki/B", base)),
        ("C", format!("{}/wiki/C", base)),
    ])
    .unwrap();

    // Concurrency does not get around the shared throttle
    let (batch, _) = run(&create_test_config(0.15, 3, 0), &topics).await;

    assert_eq!(batch.records.len(), 3);
    assert!(
        batch.summary.duration >= Duration::from_millis(300),
        "Three requests finished in {:?}",
        batch.summary.duration
    );
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let mock_server = MockServer::start().await;

    // First request fails, the next succeeds
    Mock::given(method("GET"))
        .and(path("/wiki/Flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/wiki/Flaky", simple_page("Flaky")).await;

    let url = format!("{}/wiki/Flaky", mock_server.uri());
    let topics = TopicMap::from_pairs([("Flaky", url.as_str())]).unwrap();

    let (batch, events) = run(&create_test_config(0.0, 1, 2), &topics).await;

    assert!(batch.failures.is_empty());
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].title(), "Flaky");
    assert!(matches!(
        &events.events()[0],
        CrawlEvent::PageCompleted { success: true, attempts: 2, .. }
    ));
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let url = format!("{}/wiki/Down", mock_server.uri());
    let topics = TopicMap::from_pairs([("Down", url.as_str())]).unwrap();

    let (batch, _) = run(&create_test_config(0.0, 1, 2), &topics).await;

    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].attempts, 3);
    assert_eq!(batch.failures[0].kind, FailureKind::HttpStatus);
}

#[tokio::test]
async fn test_stop_during_backoff_cancels_retry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/wiki/Down", mock_server.uri());
    let topics = TopicMap::from_pairs([("Down", url.as_str())]).unwrap();

    let mut config = create_test_config(0.0, 1, 2);
    config.crawler.retry_backoff = 400;

    let stop = StopSignal::new();
    let controller = Controller::new(&config, Arc::new(MemorySink::new()), stop.clone()).unwrap();

    // Lands while the page sleeps before its second attempt
    let interrupt = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        interrupt.request_stop();
    });

    let batch = controller.run(&topics).await;

    assert!(batch.records.is_empty());
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].attempts, 1);
    assert_eq!(batch.failures[0].kind, FailureKind::HttpStatus);
    assert_eq!(batch.summary.skipped, 0);
    assert!(batch.summary.stopped);
}

#[tokio::test]
async fn test_undecodable_body_is_parse_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Corrupt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Encoding", "gzip")
                .set_body_bytes(b"this is certainly not gzip data".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/wiki/Fine", simple_page("Fine")).await;

    let topics = TopicMap::from_pairs([
        ("Corrupt", format!("{}/wiki/Corrupt", mock_server.uri())),
        ("Fine", format!("{}/wiki/Fine", mock_server.uri())),
    ])
    .unwrap();

    // Decode errors are not transient, so retries must not kick in
    let (batch, events) = run(&create_test_config(0.0, 1, 2), &topics).await;

    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].topic, "Corrupt");
    assert_eq!(batch.failures[0].kind, FailureKind::Parse);
    assert_eq!(batch.failures[0].attempts, 1);

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].title(), "Fine");
    assert!(matches!(
        &events.events()[0],
        CrawlEvent::PageCompleted { success: false, .. }
    ));
}

#[tokio::test]
async fn test_concurrent_run_preserves_order() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let names = ["One", "Two", "Three", "Four", "Five"];

    // Earlier topics answer slower, so completion order is reversed
    for (i, name) in names.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/wiki/{}", name)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(simple_page(name))
                    .set_delay(Duration::from_millis(50 * (names.len() - i) as u64)),
            )
            .mount(&mock_server)
            .await;
    }

    let topics =
        TopicMap::from_pairs(names.iter().map(|n| (*n, format!("{}/wiki/{}", base, n)))).unwrap();

    let (batch, _) = run(&create_test_config(0.0, 5, 0), &topics).await;

    let order: Vec<_> = batch.records.iter().map(|r| r.topic()).collect();
    assert_eq!(order, names.to_vec());
}

#[tokio::test]
async fn test_stop_before_run_skips_everything() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(simple_page("X")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let topics = TopicMap::from_pairs([
        ("A", format!("{}/wiki/A", mock_server.uri())),
        ("B", format!("{}/wiki/B", mock_server.uri())),
    ])
    .unwrap();

    let stop = StopSignal::new();
    stop.request_stop();
    let controller = Controller::new(
        &create_test_config(0.0, 1, 0),
        Arc::new(MemorySink::new()),
        stop,
    )
    .unwrap();

    let batch = controller.run(&topics).await;

    assert!(batch.records.is_empty());
    assert!(batch.failures.is_empty());
    assert_eq!(batch.summary.skipped, 2);
    assert!(batch.summary.stopped);
}

/// Requests a stop as soon as the first page completes
struct StopAfterFirstPage {
    stop: StopSignal,
    inner: MemorySink,
}

impl EventSink for StopAfterFirstPage {
    fn emit(&self, event: &CrawlEvent) {
        if matches!(event, CrawlEvent::PageCompleted { .. }) {
            self.stop.request_stop();
        }
        self.inner.emit(event);
    }
}

#[tokio::test]
async fn test_stop_mid_run_keeps_completed_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    for name in ["A", "B", "C"] {
        mount_page(&mock_server, &format!("/wiki/{}", name), simple_page(name)).await;
    }

    let topics = TopicMap::from_pairs([
        ("A", format!("{}/wiki/A", base)),
        ("B", format!("{}/wiki/B", base)),
        ("C", format!("{}/wiki/C", base)),
    ])
    .unwrap();

    let stop = StopSignal::new();
    let events = Arc::new(StopAfterFirstPage {
        stop: stop.clone(),
        inner: MemorySink::new(),
    });
    let controller = Controller::new(&create_test_config(0.0, 1, 0), events.clone(), stop).unwrap();

    let batch = controller.run(&topics).await;

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].topic(), "A");
    assert_eq!(batch.summary.skipped, 2);
    assert!(batch.summary.stopped);
    assert!(matches!(
        events.inner.events().last(),
        Some(CrawlEvent::RunCompleted { fetched: 1, skipped: 2, stopped: true, .. })
    ));
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    // Grab a free port, then close it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{}/wiki/Dog", addr);
    let topics = TopicMap::from_pairs([("Dog", url.as_str())]).unwrap();

    let (batch, _) = run(&create_test_config(0.0, 1, 0), &topics).await;

    assert!(batch.records.is_empty());
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].kind, FailureKind::Network);
    assert_eq!(batch.failures[0].url, url);
}

#[tokio::test]
async fn test_malformed_page_still_produces_record() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/wiki/Broken",
        "<div><p>unclosed <b>markup<div id=\"mw-content-text\">Some text".to_string(),
    )
    .await;

    let url = format!("{}/wiki/Broken", mock_server.uri());
    let topics = TopicMap::from_pairs([("Broken", url.as_str())]).unwrap();

    let (batch, _) = run(&create_test_config(0.0, 1, 0), &topics).await;

    assert!(batch.failures.is_empty());
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].title(), "Unknown");
    assert_eq!(batch.records[0].content(), "Some text");
    assert!(batch.records[0].categories().is_empty());
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Dog"))
        .and(header("user-agent", "WikipediaScraper/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DOG_PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/wiki/Dog", mock_server.uri());
    let topics = TopicMap::from_pairs([("Dog", url.as_str())]).unwrap();

    let (batch, _) = run(&create_test_config(0.0, 1, 0), &topics).await;
    assert_eq!(batch.records.len(), 1);
}

#[tokio::test]
async fn test_batch_round_trips_through_sinks() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_page(&mock_server, "/wiki/Dog", DOG_PAGE.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/wiki/Gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let topics = TopicMap::from_pairs([
        ("Dog", format!("{}/wiki/Dog", base)),
        ("Gone", format!("{}/wiki/Gone", base)),
    ])
    .unwrap();
    let (batch, _) = run(&create_test_config(0.0, 1, 0), &topics).await;
    assert_eq!(batch.records.len(), 1);

    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    // SQLite
    let db_path = temp_dir.path().join("records.db");
    let mut sqlite = SqliteSink::open(&db_path, "test-hash").unwrap();
    assert_eq!(persist_batch(&mut sqlite, &batch).unwrap(), 1);

    let reader = sqlite.reader();
    assert_eq!(reader.load_records(sqlite.run_id()).unwrap(), batch.records);
    assert_eq!(reader.load_failures(sqlite.run_id()).unwrap(), batch.failures);

    // JSON lines
    let jsonl_path = temp_dir.path().join("records.jsonl");
    let mut jsonl = JsonLinesSink::create(&jsonl_path).unwrap();
    assert_eq!(persist_batch(&mut jsonl, &batch).unwrap(), 1);
    assert_eq!(read_records(&jsonl_path).unwrap(), batch.records);
}
