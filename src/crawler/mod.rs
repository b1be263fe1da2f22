//! Crawler module for polite single-site crawling
//!
//! This module contains the core crawling logic, including:
//! - The frontier queue and its prioritization
//! - The adaptive politeness delay
//! - HTTP fetching and link extraction behind replaceable traits
//! - Overall crawl coordination and checkpointing

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod politeness;

pub use coordinator::{
    classify, Coordinator, CrawlSummary, FetchOutcome, RunCounters, StopReason,
    EXCLUDED_STATUSES,
};
pub use fetcher::{
    build_http_client, build_robots_client, FetchError, FetchedPage, Fetcher, HttpFetcher,
};
pub use frontier::{
    Frontier, FrontierEntry, FrontierSnapshot, PendingCounts, ReorderSummary, RequeueOutcome,
};
pub use parser::{strip_scripts, HtmlLinkExtractor, LinkExtractor};
pub use politeness::{DelayAdjustment, Politeness, MAX_CRAWL_DELAY, MIN_CRAWL_DELAY};

use crate::config::Config;
use crate::robots::{fetch_robots, RobotsRules};
use crate::state::CrawlState;
use crate::storage::{Checkpoint, CheckpointStore, PageStore, SqliteCheckpointStore};
use crate::url::parse_seed_url;
use crate::ForageError;
use chrono::Utc;
use std::time::Duration;

/// Options of a single `crawl` invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Ignore any stored checkpoint
    pub fresh: bool,
    /// Stop after this many dequeued entries
    pub max_iterations: Option<u64>,
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher
/// 2. Fetch robots.txt (fatal on failure)
/// 3. Open the page store and the checkpoint database
/// 4. Resume from the checkpoint or start from the base URL
/// 5. Crawl until the frontier is empty, the iteration limit or Ctrl-C
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `options` - Per-invocation options
pub async fn crawl(config: &Config, options: CrawlOptions) -> Result<CrawlSummary, ForageError> {
    let timeout = Duration::from_secs(config.crawler.page_load_timeout);
    let robots_client = build_robots_client(&config.user_agent, timeout)?;
    let robots = fetch_robots(&robots_client, &config.crawler.base_url).await?;
    let fetcher = HttpFetcher::new(config.user_agent.clone(), timeout)?;

    let pages = PageStore::open(&config.storage.data_dir, &config.storage.ledger_path)?;
    let checkpoints = SqliteCheckpointStore::new(&config.storage.checkpoint_path)?;

    let mut coordinator = Coordinator::new(
        &config.crawler,
        robots,
        fetcher,
        HtmlLinkExtractor,
        checkpoints,
        pages,
        options.fresh,
    )?;
    coordinator.run(options.max_iterations).await
}

/// Prepends URLs to the checkpointed queue
///
/// Creates a fresh checkpoint first when none exists. Every URL must be an
/// absolute HTTP(S) URL. Robots rules are not consulted here; the crawl loop
/// checks them again when the URL is dequeued.
///
/// # Returns
///
/// The number of URLs placed at the head of the queue
pub fn seed(config: &Config, urls: &[String]) -> Result<usize, ForageError> {
    let urls = urls
        .iter()
        .map(|u| parse_seed_url(u))
        .collect::<Result<Vec<_>, _>>()?;
    let mut store = SqliteCheckpointStore::new(&config.storage.checkpoint_path)?;

    let checkpoint = match store.load()? {
        Some(checkpoint) => checkpoint,
        None => Checkpoint {
            state: CrawlState::fresh(&config.crawler, Utc::now()),
            frontier: Frontier::seeded(&config.crawler, RobotsRules::allow_all()).snapshot(),
        },
    };

    let mut frontier =
        Frontier::from_snapshot(&config.crawler, RobotsRules::allow_all(), checkpoint.frontier);
    let placed = frontier.seed(&urls);

    store.save(&Checkpoint {
        state: checkpoint.state,
        frontier: frontier.snapshot(),
    })?;

    tracing::info!(
        requested = urls.len(),
        placed,
        pending = frontier.len(),
        "Seeded frontier"
    );
    Ok(placed)
}
