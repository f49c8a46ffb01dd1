//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls against them end-to-end.

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use webscraper::config::{Config, CrawlerConfig, ImagesConfig, OutputConfig, UserAgentConfig};
use webscraper::crawler::{HttpDocumentFetcher, RetryPolicy};
use webscraper::images::{ImagePipeline, ProcessedImageCache, MIN_COMPRESS_SIZE};
use webscraper::proxy::{HttpProxyChecker, ProxyInfo};
use webscraper::robots::HttpRobotsProvider;
use webscraper::storage::{ImageStore, SqliteImageStore};
use webscraper::{Coordinator, ScraperError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a coordinator whose robots.txt and proxy probe point at the mock server
fn test_coordinator(server: &MockServer, policy: RetryPolicy) -> Coordinator {
    let robots = HttpRobotsProvider::new(&UserAgentConfig::default())
        .expect("Failed to build robots client")
        .with_base_url(server.uri());

    Coordinator::new(
        &CrawlerConfig::default(),
        Arc::new(HttpDocumentFetcher::with_policy(policy)),
        Arc::new(robots),
        Arc::new(HttpProxyChecker::new(format!("{}/probe", server.uri()))),
    )
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        initial_backoff: Duration::from_millis(10),
        multiplier: 2,
    }
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// A PNG of random pixels, which barely compresses
fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut seed: u32 = 0x0bad_f00d;
    let img = ImageBuffer::from_fn(width, height, |_, _| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let [r, g, b, _] = seed.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/page1", r#"<a href="/page2">again</a>"#.to_string()).await;
    mount_page(&server, "/page2", r#"<a href="/">home</a>"#.to_string()).await;

    let visited = test_coordinator(&server, fast_retries())
        .start_scraping(&format!("{}/", base), 3, None, Vec::new())
        .await
        .expect("Crawl failed");

    assert_eq!(visited.len(), 3, "visited: {:?}", visited);
    assert!(visited.contains(&format!("{}/", base)));
    assert!(visited.contains(&format!("{}/page1", base)));
    assert!(visited.contains(&format!("{}/page2", base)));

    // Each page was requested exactly once
    let requests = server.received_requests().await.expect("Recording disabled");
    for page in ["/", "/page1", "/page2"] {
        let hits = requests.iter().filter(|r| r.url.path() == page).count();
        assert_eq!(hits, 1, "{} requested {} times", page, hits);
    }
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        r#"<a href="/allowed">Allowed</a><a href="/admin">Admin</a>"#.to_string(),
    )
    .await;
    mount_page(&server, "/allowed", "<p>Allowed content</p>".to_string()).await;

    // Should never be called
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Admin content"))
        .expect(0)
        .mount(&server)
        .await;

    let visited = test_coordinator(&server, fast_retries())
        .start_scraping(&format!("{}/", server.uri()), 2, None, Vec::new())
        .await
        .expect("Crawl failed");

    assert!(visited.contains(&format!("{}/allowed", server.uri())));
    assert!(!visited.contains(&format!("{}/admin", server.uri())));
}

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/flaky">flaky</a>"#.to_string()).await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/after-flaky">next</a>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    mount_page(&server, "/after-flaky", "<p>done</p>".to_string()).await;

    let visited = test_coordinator(&server, fast_retries())
        .start_scraping(&format!("{}/", server.uri()), 3, None, Vec::new())
        .await
        .expect("Crawl failed");

    // Links on the page fetched on the fourth attempt were followed
    assert!(visited.contains(&format!("{}/after-flaky", server.uri())));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/missing">missing</a>"#.to_string()).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let visited = test_coordinator(&server, fast_retries())
        .start_scraping(&format!("{}/", server.uri()), 2, None, Vec::new())
        .await
        .expect("Crawl failed");

    // Admitted, even though the fetch failed
    assert!(visited.contains(&format!("{}/missing", server.uri())));
}

#[tokio::test]
async fn test_dead_proxy_is_dropped() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/next">next</a>"#.to_string()).await;
    mount_page(&server, "/next", "<p>next</p>".to_string()).await;

    let visited = test_coordinator(&server, fast_retries())
        .start_scraping(
            &format!("{}/", server.uri()),
            1,
            None,
            vec![ProxyInfo::new("127.0.0.1", 1)],
        )
        .await
        .expect("Crawl failed");

    assert_eq!(visited.len(), 2);
}

#[tokio::test]
async fn test_large_images_are_compressed_and_recorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let big = noisy_png(320, 320);
    assert!(big.len() >= MIN_COMPRESS_SIZE);

    mount_page(
        &server,
        "/",
        r#"<img src="/big.png"><img src="/small.png">
           <a href="/gallery">gallery</a>"#
            .to_string(),
    )
    .await;
    // Same image referenced again from a second page
    mount_page(&server, "/gallery", r#"<img src="/big.png">"#.to_string()).await;

    Mock::given(method("GET"))
        .and(path("/big.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(big)
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/small.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(noisy_png(8, 8))
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    let store = Arc::new(
        SqliteImageStore::new(&dir.path().join("images.db")).expect("Failed to open store"),
    );
    let pipeline = ImagePipeline::new(
        dir.path().join("compressed"),
        store.clone(),
        Arc::new(ProcessedImageCache::new()),
    )
    .expect("Failed to build pipeline");

    test_coordinator(&server, fast_retries())
        .with_image_pipeline(Arc::new(pipeline))
        .start_scraping(&format!("{}/", server.uri()), 1, None, Vec::new())
        .await
        .expect("Crawl failed");

    assert_eq!(store.count_images().unwrap(), 1);

    let stored = store
        .find_by_original_url(&format!("{}/big.png", server.uri()))
        .unwrap()
        .expect("big.png was not recorded");
    assert!(stored.record.compressed_size > 0);
    assert!(std::path::Path::new(&stored.record.stored_path).exists());
    assert!(stored.record.stored_path.ends_with(".jpg"));

    assert!(store
        .find_by_original_url(&format!("{}/small.png", server.uri()))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_bad_data_uri_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_page(
        &server,
        "/",
        r#"<img src="data:text/plain;base64,SGVsbG8=">
           <img src="data:image/png;base64,@@@">
           <a href="/next">next</a>"#
            .to_string(),
    )
    .await;
    mount_page(&server, "/next", "<p>still crawled</p>".to_string()).await;

    let store = Arc::new(SqliteImageStore::new_in_memory().expect("Failed to open store"));
    let pipeline = ImagePipeline::new(
        dir.path(),
        store.clone(),
        Arc::new(ProcessedImageCache::new()),
    )
    .expect("Failed to build pipeline");

    let visited = test_coordinator(&server, fast_retries())
        .with_image_pipeline(Arc::new(pipeline))
        .start_scraping(&format!("{}/", server.uri()), 1, None, Vec::new())
        .await
        .expect("Crawl failed");

    assert!(visited.contains(&format!("{}/next", server.uri())));
    assert_eq!(store.count_images().unwrap(), 0);
}

#[tokio::test]
async fn test_from_config_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_page(&server, "/", r#"<a href="/about">about</a>"#.to_string()).await;
    mount_page(&server, "/about", "<p>about</p>".to_string()).await;

    let db_path = dir.path().join("data").join("images.db");
    let config = Config {
        images: ImagesConfig {
            output_directory: dir.path().join("out").to_string_lossy().into_owned(),
            ..ImagesConfig::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
        ..Config::default()
    };

    let coordinator = Coordinator::from_config(&config).expect("Failed to create coordinator");
    let visited = coordinator
        .start_scraping(&format!("{}/", server.uri()), 1, Some(5), Vec::new())
        .await
        .expect("Crawl failed");

    assert_eq!(visited.len(), 2);
    assert!(db_path.exists());
    assert!(dir.path().join("out").is_dir());
}

#[tokio::test]
async fn test_invalid_seed_fails_run() {
    let server = MockServer::start().await;

    let result = test_coordinator(&server, fast_retries())
        .start_scraping("mailto:someone@example.com", 1, None, Vec::new())
        .await;

    assert!(matches!(result, Err(ScraperError::InvalidSeed { .. })));
}
