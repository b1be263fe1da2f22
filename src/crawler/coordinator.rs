//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Starting fresh or resuming from the last checkpoint
//! - Reordering the frontier on schedule
//! - Pacing requests with the politeness controller
//! - Classifying fetch results and routing URLs accordingly
//! - Checkpointing periodically and on every exit path

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry, RequeueOutcome};
use crate::crawler::parser::{strip_scripts, LinkExtractor};
use crate::robots::RobotsRules;
use crate::state::CrawlState;
use crate::storage::{Checkpoint, CheckpointStore, PageStore, SavedPage};
use crate::ForageError;
use chrono::Utc;
use std::future::Future;

/// Statuses that permanently exclude a URL
pub const EXCLUDED_STATUSES: &[u16] = &[301, 302, 403, 404, 443];

const STATUS_OK: u16 = 200;
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// How a fetch attempt is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200: the body is stored and its links followed
    Success(String),
    /// 429: retried, and fed back into the politeness controller
    RateLimited,
    /// Never fetched again
    PermanentlyExcluded(u16),
    /// Retried until `max-retries` is exhausted
    Transient(String),
    /// Retried after the fetcher is reinitialized
    DriverFault(String),
}

/// Classifies the result of [`Fetcher::fetch`]
pub fn classify(result: Result<FetchedPage, FetchError>) -> FetchOutcome {
    match result {
        Ok(page) if page.status == STATUS_OK => FetchOutcome::Success(page.body),
        Ok(page) => classify_status(page.status),
        Err(FetchError::Http(status)) => classify_status(status),
        Err(FetchError::Timeout) => FetchOutcome::Transient("page load timed out".to_string()),
        Err(FetchError::DriverFault(reason)) => FetchOutcome::DriverFault(reason),
        Err(FetchError::Other(reason)) => FetchOutcome::Transient(reason),
    }
}

fn classify_status(status: u16) -> FetchOutcome {
    if status == STATUS_TOO_MANY_REQUESTS {
        FetchOutcome::RateLimited
    } else if EXCLUDED_STATUSES.contains(&status) {
        FetchOutcome::PermanentlyExcluded(status)
    } else {
        FetchOutcome::Transient(format!("HTTP {}", status))
    }
}

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FrontierEmpty,
    IterationLimit,
    Interrupted,
}

/// Per-run outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub iterations: u64,
    pub skipped: u64,
    pub pages_saved: u64,
    pub rate_limited: u64,
    pub excluded: u64,
    pub transient_failures: u64,
    pub driver_faults: u64,
    pub gave_up: u64,
    pub checkpoints: u64,
}

/// Summary returned when a crawl run ends
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub stop_reason: StopReason,
    pub counters: RunCounters,
    pub pending: usize,
    pub visited: usize,
    pub failed: usize,
    pub never_crawl: usize,
    pub total_bytes_crawled: u64,
    pub crawl_delay: f64,
}

/// Main crawler coordinator structure
pub struct Coordinator<F, L, S> {
    config: CrawlerConfig,
    frontier: Frontier,
    state: CrawlState,
    fetcher: F,
    extractor: L,
    checkpoints: S,
    pages: PageStore,
    in_flight: Option<FrontierEntry>,
    successes_since_save: u32,
    counters: RunCounters,
}

impl<F, L, S> Coordinator<F, L, S>
where
    F: Fetcher,
    L: LinkExtractor,
    S: CheckpointStore,
{
    /// Creates a new coordinator, resuming from the stored checkpoint if any
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `robots` - Disallow rules fetched at startup
    /// * `fetcher` - Page fetcher
    /// * `extractor` - Link extractor
    /// * `checkpoints` - Checkpoint backend
    /// * `pages` - Page store
    /// * `fresh` - Discard any stored checkpoint and start from the base URL
    pub fn new(
        config: &CrawlerConfig,
        robots: RobotsRules,
        fetcher: F,
        extractor: L,
        mut checkpoints: S,
        pages: PageStore,
        fresh: bool,
    ) -> Result<Self, ForageError> {
        if fresh {
            checkpoints.clear()?;
        }

        let (frontier, state) = match checkpoints.load()? {
            Some(checkpoint) => Self::resume(config, robots, checkpoint, &pages)?,
            None => {
                tracing::info!(base_url = %config.base_url, "Starting fresh crawl");
                (
                    Frontier::seeded(config, robots),
                    CrawlState::fresh(config, Utc::now()),
                )
            }
        };

        Ok(Self {
            config: config.clone(),
            frontier,
            state,
            fetcher,
            extractor,
            checkpoints,
            pages,
            in_flight: None,
            successes_since_save: 0,
            counters: RunCounters::default(),
        })
    }

    fn resume(
        config: &CrawlerConfig,
        robots: RobotsRules,
        checkpoint: Checkpoint,
        pages: &PageStore,
    ) -> Result<(Frontier, CrawlState), ForageError> {
        let Checkpoint {
            mut state,
            frontier,
        } = checkpoint;
        let retried = frontier.failed.len();

        let mut frontier = Frontier::restore(config, robots, frontier);

        state.total_bytes_crawled = pages.total_bytes()?;
        state.politeness.clamp_min(config.resume_min_delay);

        let summary = frontier.reorder();
        state.schedule_reorder(&summary);

        tracing::info!(
            iteration = state.iteration,
            pending = frontier.len(),
            retried_failed = retried,
            visited = frontier.visited_count(),
            crawl_delay = state.politeness.crawl_delay,
            total_bytes = state.total_bytes_crawled,
            "Resuming crawl from checkpoint"
        );
        Ok((frontier, state))
    }

    /// Runs the crawl until the frontier is empty or Ctrl-C is pressed
    pub async fn run(&mut self, max_iterations: Option<u64>) -> Result<CrawlSummary, ForageError> {
        self.run_until(max_iterations, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs the crawl until the frontier is empty, the iteration limit is hit
    /// or `shutdown` completes
    ///
    /// Whatever stops the loop, a final checkpoint is written before returning.
    pub async fn run_until<Sd>(
        &mut self,
        max_iterations: Option<u64>,
        shutdown: Sd,
    ) -> Result<CrawlSummary, ForageError>
    where
        Sd: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            result = self.crawl_loop(max_iterations) => result,
            _ = shutdown => {
                tracing::warn!("Interrupt received, stopping crawl");
                Ok(StopReason::Interrupted)
            }
        };

        if let Some(entry) = self.in_flight.take() {
            tracing::debug!(url = %entry.url, "Returning unfinished URL to the frontier");
            self.frontier.return_unprocessed(entry);
        }

        let saved = self.checkpoint();

        let stop_reason = match outcome {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!("Crawl aborted: {}", e);
                saved?;
                return Err(e);
            }
        };
        saved?;

        let summary = self.summary(stop_reason);
        tracing::info!(
            stop_reason = ?summary.stop_reason,
            iterations = summary.counters.iterations,
            pages_saved = summary.counters.pages_saved,
            pending = summary.pending,
            "Crawl stopped"
        );
        Ok(summary)
    }

    async fn crawl_loop(&mut self, max_iterations: Option<u64>) -> Result<StopReason, ForageError> {
        loop {
            if max_iterations.is_some_and(|max| self.counters.iterations >= max) {
                tracing::info!("Iteration limit reached");
                return Ok(StopReason::IterationLimit);
            }

            if self.state.reorder_due() {
                let summary = self.frontier.reorder();
                self.state.schedule_reorder(&summary);
                tracing::info!(
                    product_detail = summary.product_detail,
                    product_list = summary.product_list,
                    other = summary.other,
                    next_reorder = self.state.next_reorder_iteration,
                    "Reordered frontier"
                );
            }

            let Some(entry) = self.frontier.dequeue() else {
                tracing::info!("Frontier is empty, crawl complete");
                return Ok(StopReason::FrontierEmpty);
            };

            self.state.iteration += 1;
            self.counters.iterations += 1;

            if self.frontier.should_skip(&entry.url) {
                tracing::debug!(url = %entry.url, "Skipping known or disallowed URL");
                self.counters.skipped += 1;
                continue;
            }

            self.in_flight = Some(entry.clone());

            tokio::time::sleep(self.state.politeness.delay()).await;

            if let Some(adjustment) = self.state.politeness.adjust(Utc::now()) {
                tracing::info!(
                    from = adjustment.from,
                    to = adjustment.to,
                    too_many_requests = adjustment.too_many_requests,
                    successes = adjustment.successes,
                    "Adjusted crawl delay"
                );
            }

            tracing::debug!(url = %entry.url, retry_count = entry.retry_count, "Fetching");
            let outcome = classify(self.fetcher.fetch(&entry.url).await);
            self.in_flight = None;

            let needs_reinit = self.apply_outcome(entry, outcome)?;
            if needs_reinit {
                self.fetcher.reinitialize().await?;
            }
        }
    }

    /// Routes a classified fetch result; returns true when the fetcher must be reinitialized
    fn apply_outcome(
        &mut self,
        entry: FrontierEntry,
        outcome: FetchOutcome,
    ) -> Result<bool, ForageError> {
        let url = entry.url;

        match outcome {
            FetchOutcome::Success(body) => {
                let content = strip_scripts(&body);
                match self.pages.save(&url, &content) {
                    Ok(saved) => self.handle_success(&url, &content, saved)?,
                    Err(e) => {
                        // a page that could not be stored is retried like any other failure
                        self.counters.transient_failures += 1;
                        tracing::warn!(url = %url, retry_count = entry.retry_count, "Failed to store page: {}", e);
                        self.requeue(&url, entry.retry_count);
                    }
                }
            }
            FetchOutcome::RateLimited => {
                self.counters.rate_limited += 1;
                self.state.politeness.record_rate_limited();
                tracing::warn!(url = %url, retry_count = entry.retry_count, status = STATUS_TOO_MANY_REQUESTS, "Rate limited");
                self.requeue(&url, entry.retry_count);
            }
            FetchOutcome::PermanentlyExcluded(status) => {
                self.counters.excluded += 1;
                tracing::info!(url = %url, status, "Excluding URL");
                self.frontier.mark_never_crawl(&url);
                self.state.politeness.record_success();
            }
            FetchOutcome::Transient(reason) => {
                self.counters.transient_failures += 1;
                tracing::warn!(url = %url, retry_count = entry.retry_count, "Fetch failed: {}", reason);
                self.requeue(&url, entry.retry_count);
            }
            FetchOutcome::DriverFault(reason) => {
                self.counters.driver_faults += 1;
                tracing::error!(url = %url, retry_count = entry.retry_count, "Fetcher fault: {}", reason);
                self.requeue(&url, entry.retry_count);
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn handle_success(
        &mut self,
        url: &str,
        content: &str,
        saved: SavedPage,
    ) -> Result<(), ForageError> {
        if saved.newly_saved {
            self.counters.pages_saved += 1;
        }
        self.state.record_page(saved.url_hash, url.to_string(), saved.bytes);
        self.frontier.mark_visited(url);

        let links = self.extractor.extract_links(content, url);
        let queued = links
            .iter()
            .filter(|link| self.frontier.enqueue(link))
            .count();
        tracing::info!(
            url = %url,
            bytes = saved.bytes,
            links = links.len(),
            queued,
            pending = self.frontier.len(),
            "Crawled page"
        );

        self.state.politeness.record_success();
        self.successes_since_save += 1;
        if self.successes_since_save >= self.config.save_interval {
            self.checkpoint()?;
        }
        Ok(())
    }

    fn requeue(&mut self, url: &str, retry_count: u32) {
        match self.frontier.requeue_on_failure(url, retry_count) {
            RequeueOutcome::Requeued {
                retry_count,
                position,
            } => {
                tracing::debug!(url = %url, retry_count, position, "Requeued");
            }
            RequeueOutcome::Failed { retry_count } => {
                self.counters.gave_up += 1;
                tracing::warn!(url = %url, retry_count, "Retries exhausted, marking failed");
            }
        }
    }

    /// Writes a checkpoint of the current frontier and state
    pub fn checkpoint(&mut self) -> Result<(), ForageError> {
        let bytes_since_last_save = self.state.bytes_since_last_save();

        let mut state = self.state.clone();
        state.mark_saved();
        let checkpoint = Checkpoint {
            state,
            frontier: self.frontier.snapshot(),
        };
        self.checkpoints.save(&checkpoint)?;

        self.state.mark_saved();
        self.successes_since_save = 0;
        self.counters.checkpoints += 1;

        tracing::info!(
            iteration = self.state.iteration,
            pending = self.frontier.len(),
            visited = self.frontier.visited_count(),
            bytes_since_last_save,
            total_bytes = self.state.total_bytes_crawled,
            "Checkpoint saved"
        );
        Ok(())
    }

    fn summary(&self, stop_reason: StopReason) -> CrawlSummary {
        CrawlSummary {
            stop_reason,
            counters: self.counters,
            pending: self.frontier.len(),
            visited: self.frontier.visited_count(),
            failed: self.frontier.failed_count(),
            never_crawl: self.frontier.never_crawl_count(),
            total_bytes_crawled: self.state.total_bytes_crawled,
            crawl_delay: self.state.politeness.crawl_delay,
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}
