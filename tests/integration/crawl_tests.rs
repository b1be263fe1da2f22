//! Integration tests for the crawler
//!
//! These tests drive the coordinator with a scripted fetcher and against a
//! wiremock server, checking the frontier, the page store and the checkpoint
//! database after each run.

use forage::config::{
    Config, CrawlerConfig, IndexConfig, SearchConfig, StorageConfig, UserAgentConfig,
};
use forage::crawler::{
    crawl, seed, Coordinator, CrawlOptions, FetchError, FetchedPage, Fetcher, HtmlLinkExtractor,
    StopReason,
};
use forage::robots::RobotsRules;
use forage::storage::{CheckpointStore, PageStore, SqliteCheckpointStore};
use forage::ForageError;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "https://shop.test";

/// Serves fixed bodies per URL; unknown URLs get a 404
#[derive(Default)]
struct StubFetcher {
    pages: HashMap<String, String>,
    calls: Vec<String>,
}

impl StubFetcher {
    fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

impl Fetcher for StubFetcher {
    async fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.push(url.to_string());
        match self.pages.get(url) {
            Some(body) => Ok(FetchedPage {
                status: 200,
                body: body.clone(),
            }),
            None => Err(FetchError::Http(404)),
        }
    }

    async fn reinitialize(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}

fn crawler_config(base_url: &str) -> CrawlerConfig {
    CrawlerConfig {
        base_url: base_url.to_string(),
        max_retries: 3,
        save_interval: 1,
        initial_crawl_delay: 0.0,
        resume_min_delay: 0.0,
        reorder_interval: 500,
        page_load_timeout: 5,
        detail_path_prefix: "/product/".to_string(),
    }
}

/// Creates a full configuration with every file under `dir`
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    Config {
        crawler: crawler_config(base_url),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            data_dir: dir.join("data"),
            ledger_path: dir.join("url_hashes.txt"),
            checkpoint_path: dir.join("crawler_state.db"),
        },
        index: IndexConfig::default(),
        search: SearchConfig::default(),
    }
}

fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

fn stub_coordinator(
    dir: &TempDir,
    robots: RobotsRules,
    fetcher: StubFetcher,
    fresh: bool,
) -> Coordinator<StubFetcher, HtmlLinkExtractor, SqliteCheckpointStore> {
    let config = create_test_config(BASE, dir.path());
    let pages = PageStore::open(&config.storage.data_dir, &config.storage.ledger_path).unwrap();
    let store = SqliteCheckpointStore::new(&config.storage.checkpoint_path).unwrap();
    Coordinator::new(
        &config.crawler,
        robots,
        fetcher,
        HtmlLinkExtractor,
        store,
        pages,
        fresh,
    )
    .unwrap()
}

#[tokio::test]
async fn test_one_cycle_respects_robots() {
    let dir = TempDir::new().unwrap();
    let robots = RobotsRules::from_content("User-agent: *\nDisallow: /admin\n");
    let fetcher = StubFetcher::default().page(
        BASE,
        r#"<a href="/admin/x">admin</a><a href="/product/7">seven</a>"#,
    );

    let mut coordinator = stub_coordinator(&dir, robots, fetcher, false);
    let summary = coordinator
        .run_until(Some(1), std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::IterationLimit);
    assert!(coordinator.frontier().is_visited(BASE));
    assert!(coordinator.frontier().is_pending(&url("/product/7")));
    assert!(!coordinator.frontier().is_pending(&url("/admin/x")));
    assert_eq!(coordinator.frontier().len(), 1);
}

#[tokio::test]
async fn test_checkpoint_roundtrip_through_sqlite() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::default().page(
        BASE,
        r#"<a href="/product/1">one</a><a href="/brand/x">brand</a>"#,
    );

    let mut coordinator = stub_coordinator(&dir, RobotsRules::allow_all(), fetcher, false);
    coordinator
        .run_until(Some(1), std::future::pending())
        .await
        .unwrap();
    let expected_state = coordinator.state().clone();

    let config = create_test_config(BASE, dir.path());
    let store = SqliteCheckpointStore::new(&config.storage.checkpoint_path).unwrap();
    let checkpoint = store.load().unwrap().expect("checkpoint written");

    assert_eq!(checkpoint.state.iteration, expected_state.iteration);
    assert_eq!(checkpoint.state.url_hashes, expected_state.url_hashes);
    assert_eq!(
        checkpoint.state.total_bytes_crawled,
        expected_state.total_bytes_crawled
    );
    assert!(checkpoint.frontier.visited.contains(BASE));
    let pending: Vec<&str> = checkpoint
        .frontier
        .pending
        .iter()
        .map(|e| e.url.as_str())
        .collect();
    assert_eq!(pending, vec![url("/brand/x"), url("/product/1")]);
}

#[tokio::test]
async fn test_resume_does_not_refetch_visited() {
    let dir = TempDir::new().unwrap();
    let site = || {
        StubFetcher::default()
            .page(BASE, r#"<a href="/product/1">one</a><a href="/product/2">two</a>"#)
            .page(&url("/product/1"), r#"<a href="/">home</a>"#)
            .page(&url("/product/2"), r#"<a href="/product/1">one</a>"#)
    };

    let mut first = stub_coordinator(&dir, RobotsRules::allow_all(), site(), false);
    first.run_until(Some(2), std::future::pending()).await.unwrap();
    assert_eq!(first.fetcher().calls, vec![BASE.to_string(), url("/product/1")]);
    drop(first);

    let mut second = stub_coordinator(&dir, RobotsRules::allow_all(), site(), false);
    let summary = second.run_until(None, std::future::pending()).await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(second.fetcher().calls, vec![url("/product/2")]);
    assert_eq!(summary.visited, 3);
    assert_eq!(second.state().url_hashes.len(), 3);
}

#[tokio::test]
async fn test_fresh_ignores_checkpoint() {
    let dir = TempDir::new().unwrap();
    let fetcher = StubFetcher::default().page(BASE, "<p>home</p>");
    let mut first = stub_coordinator(&dir, RobotsRules::allow_all(), fetcher, false);
    first.run_until(None, std::future::pending()).await.unwrap();
    drop(first);

    let fetcher = StubFetcher::default().page(BASE, "<p>home</p>");
    let mut second = stub_coordinator(&dir, RobotsRules::allow_all(), fetcher, true);
    second.run_until(None, std::future::pending()).await.unwrap();

    // the page file survives, so the second save writes nothing new
    assert_eq!(second.fetcher().calls, vec![BASE.to_string()]);
    let ledger = std::fs::read_to_string(dir.path().join("url_hashes.txt")).unwrap();
    assert_eq!(ledger.lines().count(), 1);
}

#[test]
fn test_seed_places_urls_first() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(BASE, dir.path());
    let urls = vec![url("/product/5/"), url("/product/6"), "https://other.test/x".to_string()];

    let placed = seed(&config, &urls).unwrap();
    assert_eq!(placed, 2);

    let store = SqliteCheckpointStore::new(&config.storage.checkpoint_path).unwrap();
    let checkpoint = store.load().unwrap().unwrap();
    let pending: Vec<&str> = checkpoint
        .frontier
        .pending
        .iter()
        .map(|e| e.url.as_str())
        .collect();
    assert_eq!(pending, vec![url("/product/5"), url("/product/6"), BASE.to_string()]);

    let bad = seed(&config, &["not a url".to_string()]);
    assert!(matches!(bad, Err(ForageError::UrlError(_))));
}

#[tokio::test]
async fn test_full_crawl_against_mock_server() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><script>var x = "<a href='/hidden'>";</script>
               <a href="/product/7">seven</a>
               <a href="/admin/panel">admin</a>
               <a href="/logo.png">logo</a></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/product/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/gone">gone</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, dir.path());
    let summary = crawl(&config, CrawlOptions::default()).await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(summary.visited, 2);
    assert_eq!(summary.never_crawl, 1);
    assert_eq!(summary.counters.pages_saved, 2);
    assert_eq!(summary.counters.excluded, 1);

    let pages = PageStore::open(&config.storage.data_dir, &config.storage.ledger_path).unwrap();
    assert_eq!(pages.page_count().unwrap(), 2);
    let home = std::fs::read_to_string(pages.page_path(&PageStore::url_hash(&base))).unwrap();
    assert!(!home.contains("<script"));
    assert!(!home.contains("/hidden"));

    let store = SqliteCheckpointStore::new(&config.storage.checkpoint_path).unwrap();
    let checkpoint = store.load().unwrap().unwrap();
    assert!(checkpoint.frontier.pending.is_empty());
    assert!(checkpoint.frontier.never_crawl.contains(&format!("{}/gone", base)));
}

#[tokio::test]
async fn test_crawl_fails_without_robots() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let result = crawl(&config, CrawlOptions::default()).await;
    assert!(matches!(result, Err(ForageError::Startup(_))));
}
