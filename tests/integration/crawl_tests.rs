//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end over real HTTP.

use std::collections::HashMap;
use std::time::Duration;
use sumi_crawl::config::parse_config;
use sumi_crawl::{CrawlError, CrawlResult, Crawler, FetchError, ImageOutcome};
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts an HTML page at `route`
async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Starts the crawl, waits for it, and collects every result
async fn run_crawl(mut crawler: Crawler) -> Vec<CrawlResult> {
    let (tx, mut rx) = mpsc::channel(64);
    crawler.set_callback_channel(tx);
    crawler.start().expect("Failed to start crawl");

    tokio::time::timeout(Duration::from_secs(30), crawler.wait())
        .await
        .expect("Crawl did not finish");
    assert!(!crawler.is_processing());
    drop(crawler);

    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}

fn find<'a>(results: &'a [CrawlResult], uri: &str) -> &'a CrawlResult {
    results
        .iter()
        .find(|r| r.uri == uri)
        .unwrap_or_else(|| panic!("No result for {}", uri))
}

#[tokio::test]
async fn test_crawl_follows_same_host_links_only() {
    let mock_server = MockServer::start().await;
    let other_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/a",
        &format!(
            r#"<html><body>
            <a href="/b">B</a>
            <a href="{}/c">Elsewhere</a>
            </body></html>"#,
            other_server.uri()
        ),
    )
    .await;
    mount_page(&mock_server, "/b", "<html><body>Leaf</body></html>").await;

    // The foreign host must never be contacted
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&other_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/a", base_url), "", "");
    crawler.set_max_workers(2);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 2);
    assert_eq!(find(&results, &format!("{}/a", base_url)).depth, 0);
    assert_eq!(find(&results, &format!("{}/b", base_url)).depth, 1);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_depth_limit_is_enforced() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/one">One</a>"#).await;
    mount_page(&mock_server, "/one", r#"<a href="/two">Two</a>"#).await;

    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(ResponseTemplate::new(200).set_body_string("too deep"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/", base_url), "", "");
    crawler.set_max_depth(1);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 2);
    assert_eq!(find(&results, &format!("{}/one", base_url)).depth, 1);
}

#[tokio::test]
async fn test_server_error_is_reported_and_links_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(r#"<a href="/hidden">Hidden</a>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/", base_url), "", "");
    crawler.set_load_images(true);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(matches!(
        result.error(),
        Some(FetchError::Status { status: 500, .. })
    ));
    assert!(result.images.is_empty());
}

/// `<html><body><a href="/unpacked">Unpacked</a></body></html>`, gzipped
const GZIPPED_PAGE: &[u8] = &[
    0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x03, 0xb3, 0xc9, 0x28, 0xc9, 0xcd,
    0xb1, 0xb3, 0x49, 0xca, 0x4f, 0xa9, 0xb4, 0xb3, 0x49, 0x54, 0xc8, 0x28, 0x4a, 0x4d, 0xb3,
    0x55, 0xd2, 0x2f, 0xcd, 0x2b, 0x48, 0x4c, 0xce, 0x4e, 0x4d, 0x51, 0xb2, 0x0b, 0x85, 0xb2,
    0x6c, 0xf4, 0x13, 0xed, 0x6c, 0xf4, 0x21, 0xca, 0xf4, 0xc1, 0x7a, 0x00, 0xce, 0x31, 0x50,
    0xa7, 0x3a, 0x00, 0x00, 0x00,
];

#[tokio::test]
async fn test_gzip_page_is_decoded_and_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(GZIPPED_PAGE.to_vec())
                .insert_header("content-type", "text/html")
                .insert_header("content-encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/unpacked"))
        .respond_with(ResponseTemplate::new(200).set_body_string("leaf"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let results = run_crawl(Crawler::new(&format!("{}/", base_url), "", "")).await;

    assert_eq!(results.len(), 2);
    let seed = find(&results, &format!("{}/", base_url));
    assert_eq!(
        seed.response().unwrap().body,
        br#"<html><body><a href="/unpacked">Unpacked</a></body></html>"#.to_vec()
    );
    assert!(find(&results, &format!("{}/unpacked", base_url)).is_success());
}

#[tokio::test]
async fn test_corrupt_gzip_body_is_a_body_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // A valid gzip header, then a deflate block with a reserved type, then
    // markup that must not be parsed as a fallback
    let mut corrupt = vec![0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x03, 0xff];
    corrupt.extend_from_slice(br#"<a href="/never">Never</a>"#);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(corrupt)
                .insert_header("content-type", "text/html")
                .insert_header("content-encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/never"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let results = run_crawl(Crawler::new(&format!("{}/", base_url), "", "")).await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].error(), Some(FetchError::Body { .. })));
}

#[tokio::test]
async fn test_missing_pages_do_not_stop_the_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/gone">Gone</a><a href="/here">Here</a>"#,
    )
    .await;
    mount_page(&mock_server, "/here", "fine").await;

    let results = run_crawl(Crawler::new(&format!("{}/", base_url), "", "")).await;

    assert_eq!(results.len(), 3);
    let gone = find(&results, &format!("{}/gone", base_url));
    assert_eq!(gone.error().and_then(|e| e.status()), Some(404));
    assert!(find(&results, &format!("{}/here", base_url)).is_success());
}

#[tokio::test]
async fn test_fragment_variants_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        &format!(
            r##"<a href="/page">1</a>
            <a href="/page#intro">2</a>
            <a href="{}/page#outro">3</a>
            <a href="#top">4</a>"##,
            base_url
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r##"<a href="/#again">home</a>"##))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/", base_url), "", "");
    crawler.set_max_workers(4);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_images_fetched_before_page_is_reported() {
    let mock_server = MockServer::start().await;
    let cdn_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        &format!(
            r#"<img src="/logo.png">
            <img src="/logo.png">
            <img src="{}/hero.jpg">
            <img src="/broken.png">
            <a href="/next">Next</a>"#,
            cdn_server.uri()
        ),
    )
    .await;
    mount_page(&mock_server, "/next", r#"<img src="/logo.png">"#).await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hero.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8]))
        .expect(1)
        .mount(&cdn_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/", base_url), "", "");
    crawler.set_load_images(true);
    crawler.set_image_workers(2);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 2);

    let home = find(&results, &format!("{}/", base_url));
    assert_eq!(home.images.len(), 3);
    let logo = home
        .images
        .iter()
        .find(|i| i.uri.ends_with("/logo.png"))
        .expect("logo result");
    match &logo.outcome {
        ImageOutcome::Fetched(Ok(response)) => {
            assert_eq!(response.body, vec![0x89, b'P', b'N', b'G']);
            assert_eq!(response.content_type(), Some("image/png"));
        }
        other => panic!("Unexpected logo outcome: {:?}", other),
    }
    let broken = home
        .images
        .iter()
        .find(|i| i.uri.ends_with("/broken.png"))
        .expect("broken image result");
    assert!(matches!(broken.outcome, ImageOutcome::Fetched(Err(_))));

    let next = find(&results, &format!("{}/next", base_url));
    assert_eq!(next.images.len(), 1);
    assert!(matches!(next.images[0].outcome, ImageOutcome::AlreadyLoaded));
}

#[tokio::test]
async fn test_auth_and_headers_sent_with_every_request() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // "user:pass"
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-crawl-run", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/private">P</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-crawl-run", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/", base_url), "user", "pass");
    let mut headers = HashMap::new();
    headers.insert("X-Crawl-Run".to_string(), "42".to_string());
    crawler.set_headers(headers);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_timeout_is_reported_per_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/slow">Slow</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(&format!("{}/", base_url), "", "");
    crawler.set_timeout(1);
    let results = run_crawl(crawler).await;

    assert_eq!(results.len(), 2);
    let slow = find(&results, &format!("{}/slow", base_url));
    assert!(matches!(slow.error(), Some(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_stop_finishes_in_flight_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links: String = (0..40)
        .map(|i| format!(r#"<a href="/p{}">p</a>"#, i))
        .collect();
    mount_page(&mock_server, "/", &links).await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("leaf")
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;

    let (tx, mut rx) = mpsc::channel(64);
    let mut crawler = Crawler::new(&format!("{}/", base_url), "", "");
    crawler.set_max_workers(2);
    crawler.set_callback_channel(tx);
    crawler.start().expect("Failed to start crawl");

    tokio::time::sleep(Duration::from_millis(300)).await;
    crawler.stop();
    tokio::time::timeout(Duration::from_secs(10), crawler.wait())
        .await
        .expect("Crawl did not drain after stop");

    assert!(!crawler.is_processing());
    assert_eq!(crawler.progress().queued, 0);
    assert_eq!(crawler.progress().active_workers, 0);
    drop(crawler);

    let mut delivered = 0;
    while rx.recv().await.is_some() {
        delivered += 1;
    }
    assert!(delivered >= 1);
    assert!(delivered < 41, "stop should leave pages unfetched");

    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), delivered);
}

#[tokio::test]
async fn test_invalid_origin_never_starts() {
    let mut crawler = Crawler::new("example.com/no-scheme", "", "");
    assert!(matches!(
        crawler.start(),
        Err(CrawlError::InvalidOrigin { .. })
    ));
    assert!(!crawler.is_processing());
    // Nothing to wait for
    crawler.wait().await;
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/docs">Docs</a>"#).await;
    mount_page(&mock_server, "/docs", r#"<a href="/docs/deeper">Deeper</a>"#).await;

    Mock::given(method("GET"))
        .and(path("/docs/deeper"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = parse_config(&format!(
        r#"
[crawler]
seed = "{}/"
max-depth = 1
max-workers = 2
timeout = 5
"#,
        base_url
    ))
    .expect("Failed to parse config");

    let results = run_crawl(Crawler::from_config(&config)).await;

    assert_eq!(results.len(), 2);
}
