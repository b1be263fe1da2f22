//! Crawl frontier: the work queue and the URL bookkeeping sets
//!
//! The frontier owns every piece of per-URL state of a crawl:
//!
//! - the ordered pending queue (`VecDeque<FrontierEntry>`)
//! - the `visited`, `failed` and `never_crawl` sets
//! - the robots.txt disallow rules used by the admissibility check
//!
//! Periodically the queue is reprioritized so product-detail pages are fetched
//! first, then numbered listing pages in ascending order, then everything else.

use crate::config::CrawlerConfig;
use crate::robots::RobotsRules;
use crate::state::UrlStatus;
use crate::url::{classify_page, has_forbidden_extension, relative_path, trailing_number, PageClass};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Queue position used when a failed fetch is put back
pub const REQUEUE_POSITION: usize = 10;

/// Number of "other" pages that add one iteration to the reorder interval
pub const OTHER_PAGES_PER_REORDER_SLOT: u64 = 4000;

/// A pending URL with its failed-attempt count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub retry_count: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retry_count: 0,
        }
    }
}

/// Serializable copy of the frontier, as stored in a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierSnapshot {
    pub pending: Vec<FrontierEntry>,
    pub visited: BTreeSet<String>,
    pub failed: BTreeSet<String>,
    pub never_crawl: BTreeSet<String>,
}

impl FrontierSnapshot {
    /// Every URL of the three bookkeeping sets with its status
    pub fn url_statuses(&self) -> impl Iterator<Item = (&str, UrlStatus)> {
        self.visited
            .iter()
            .map(|u| (u.as_str(), UrlStatus::Visited))
            .chain(self.failed.iter().map(|u| (u.as_str(), UrlStatus::Failed)))
            .chain(
                self.never_crawl
                    .iter()
                    .map(|u| (u.as_str(), UrlStatus::NeverCrawl)),
            )
    }

    /// Inserts a URL into the set matching `status`
    pub fn insert_status(&mut self, url: String, status: UrlStatus) {
        match status {
            UrlStatus::Visited => self.visited.insert(url),
            UrlStatus::Failed => self.failed.insert(url),
            UrlStatus::NeverCrawl => self.never_crawl.insert(url),
        };
    }
}

/// Bucket sizes of a reorder and the resulting interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderSummary {
    pub product_detail: u64,
    pub product_list: u64,
    pub other: u64,
    pub reorder_interval: u64,
}

/// Pending entries per page class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub product_detail: usize,
    pub product_list: usize,
    pub other: usize,
}

/// What happened to a URL after a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// Put back into the queue at `position`
    Requeued { retry_count: u32, position: usize },
    /// Retries exhausted, moved to the failed set
    Failed { retry_count: u32 },
}

/// The crawl work queue and URL sets
#[derive(Debug, Clone)]
pub struct Frontier {
    base_url: String,
    detail_prefix: String,
    max_retries: u32,
    robots: RobotsRules,
    queue: VecDeque<FrontierEntry>,
    pending: HashSet<String>,
    visited: HashSet<String>,
    failed: HashSet<String>,
    never_crawl: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new(config: &CrawlerConfig, robots: RobotsRules) -> Self {
        Self {
            base_url: config.base_url.clone(),
            detail_prefix: config.detail_path_prefix.clone(),
            max_retries: config.max_retries,
            robots,
            queue: VecDeque::new(),
            pending: HashSet::new(),
            visited: HashSet::new(),
            failed: HashSet::new(),
            never_crawl: HashSet::new(),
        }
    }

    /// Creates the frontier of a fresh crawl: the queue holds only the base URL
    pub fn seeded(config: &CrawlerConfig, robots: RobotsRules) -> Self {
        let mut frontier = Self::new(config, robots);
        let base = frontier.base_url.clone();
        frontier.push_back(FrontierEntry::new(base));
        frontier
    }

    /// Rebuilds a frontier exactly as it was snapshotted
    pub fn from_snapshot(
        config: &CrawlerConfig,
        robots: RobotsRules,
        snapshot: FrontierSnapshot,
    ) -> Self {
        let mut frontier = Self::new(config, robots);
        frontier.visited = snapshot.visited.into_iter().collect();
        frontier.failed = snapshot.failed.into_iter().collect();
        frontier.never_crawl = snapshot.never_crawl.into_iter().collect();
        for entry in snapshot.pending {
            if !frontier.pending.contains(&entry.url) {
                frontier.push_back(entry);
            }
        }
        frontier
    }

    /// Rebuilds a frontier from a checkpoint to resume crawling
    ///
    /// Previously failed URLs get another chance: they are appended after the
    /// pending entries, every entry restarts at retry 0 and the failed set is
    /// emptied.
    pub fn restore(config: &CrawlerConfig, robots: RobotsRules, snapshot: FrontierSnapshot) -> Self {
        let mut frontier = Self::new(config, robots);
        frontier.visited = snapshot.visited.into_iter().collect();
        frontier.never_crawl = snapshot.never_crawl.into_iter().collect();

        let urls = snapshot
            .pending
            .into_iter()
            .map(|entry| entry.url)
            .chain(snapshot.failed);
        for url in urls {
            if !frontier.pending.contains(&url) {
                frontier.push_back(FrontierEntry::new(url));
            }
        }
        frontier
    }

    /// Copies the frontier into a checkpoint snapshot
    pub fn snapshot(&self) -> FrontierSnapshot {
        FrontierSnapshot {
            pending: self.queue.iter().cloned().collect(),
            visited: self.visited.iter().cloned().collect(),
            failed: self.failed.iter().cloned().collect(),
            never_crawl: self.never_crawl.iter().cloned().collect(),
        }
    }

    /// Checks the admissibility rules that do not depend on crawl history
    ///
    /// A URL is crawlable when it is on the configured origin, does not end in
    /// a forbidden extension and its base-relative path matches no robots
    /// disallow pattern.
    pub fn can_crawl(&self, url: &str) -> bool {
        let Some(path) = relative_path(url, &self.base_url) else {
            return false;
        };
        if has_forbidden_extension(url) {
            return false;
        }
        let path = if path.is_empty() { "/" } else { path };
        !self.robots.is_disallowed(path)
    }

    /// Queues a discovered URL at the back
    ///
    /// Returns false when the URL is already known (visited, failed,
    /// never-crawl or pending) or not crawlable.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.is_known(url) || !self.can_crawl(url) {
            return false;
        }
        self.push_back(FrontierEntry::new(url));
        true
    }

    /// Pushes operator-supplied URLs to the front of the queue, in the given order
    ///
    /// URLs that are already pending move to the front with their retry count
    /// reset. Returns the number of URLs placed.
    pub fn seed<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut placed = Vec::new();
        for url in urls {
            let url = url.as_ref();
            if self.visited.contains(url)
                || self.never_crawl.contains(url)
                || !self.can_crawl(url)
                || placed.iter().any(|p: &String| p == url)
            {
                continue;
            }
            placed.push(url.to_string());
        }

        if placed.is_empty() {
            return 0;
        }

        self.queue.retain(|entry| !placed.contains(&entry.url));
        for url in placed.iter().rev() {
            self.failed.remove(url);
            self.pending.insert(url.clone());
            self.queue.push_front(FrontierEntry::new(url.clone()));
        }
        placed.len()
    }

    /// Pops the head of the queue
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        let entry = self.queue.pop_front()?;
        self.pending.remove(&entry.url);
        Some(entry)
    }

    /// Puts a dequeued entry back at the head when its fetch was abandoned
    pub fn return_unprocessed(&mut self, entry: FrontierEntry) {
        if self.is_known(&entry.url) {
            return;
        }
        self.pending.insert(entry.url.clone());
        self.queue.push_front(entry);
    }

    /// Puts a URL back after a failed attempt
    ///
    /// The retry count is incremented; past `max_retries` the URL is moved to
    /// the failed set, otherwise it is inserted near the head of the queue.
    pub fn requeue_on_failure(&mut self, url: &str, retry_count: u32) -> RequeueOutcome {
        let retry_count = retry_count + 1;
        if retry_count > self.max_retries {
            self.failed.insert(url.to_string());
            return RequeueOutcome::Failed { retry_count };
        }

        let position = REQUEUE_POSITION.min(self.queue.len());
        self.pending.insert(url.to_string());
        self.queue.insert(
            position,
            FrontierEntry {
                url: url.to_string(),
                retry_count,
            },
        );
        RequeueOutcome::Requeued {
            retry_count,
            position,
        }
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    pub fn mark_never_crawl(&mut self, url: &str) {
        self.never_crawl.insert(url.to_string());
    }

    /// Returns true when a dequeued URL must be skipped without fetching
    pub fn should_skip(&self, url: &str) -> bool {
        self.visited.contains(url) || self.never_crawl.contains(url) || !self.can_crawl(url)
    }

    /// Reprioritizes the queue
    ///
    /// Product-detail pages come first in their current order, then listing
    /// pages sorted by their trailing number (unnumbered ones last), then all
    /// other pages in their current order.
    pub fn reorder(&mut self) -> ReorderSummary {
        let mut detail = Vec::new();
        let mut listing = Vec::new();
        let mut other = Vec::new();

        for entry in self.queue.drain(..) {
            match classify_page(&entry.url, &self.base_url, &self.detail_prefix) {
                PageClass::ProductDetail => detail.push(entry),
                PageClass::ProductList => listing.push(entry),
                PageClass::Other => other.push(entry),
            }
        }

        listing.sort_by_key(|entry| trailing_number(&entry.url).map_or((1, 0), |n| (0, n)));

        let product_detail = detail.len() as u64;
        let product_list = listing.len() as u64;
        let other_count = other.len() as u64;

        self.queue.extend(detail);
        self.queue.extend(listing);
        self.queue.extend(other);

        ReorderSummary {
            product_detail,
            product_list,
            other: other_count,
            reorder_interval: product_detail
                + product_list
                + other_count.div_ceil(OTHER_PAGES_PER_REORDER_SLOT),
        }
    }

    /// Counts pending entries per page class
    pub fn pending_by_class(&self) -> PendingCounts {
        let mut counts = PendingCounts::default();
        for entry in &self.queue {
            match classify_page(&entry.url, &self.base_url, &self.detail_prefix) {
                PageClass::ProductDetail => counts.product_detail += 1,
                PageClass::ProductList => counts.product_list += 1,
                PageClass::Other => counts.other += 1,
            }
        }
        counts
    }

    pub fn pending_entries(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn is_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    pub fn is_never_crawl(&self, url: &str) -> bool {
        self.never_crawl.contains(url)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn never_crawl_count(&self) -> usize {
        self.never_crawl.len()
    }

    fn is_known(&self, url: &str) -> bool {
        self.visited.contains(url)
            || self.never_crawl.contains(url)
            || self.failed.contains(url)
            || self.pending.contains(url)
    }

    fn push_back(&mut self, entry: FrontierEntry) {
        self.pending.insert(entry.url.clone());
        self.queue.push_back(entry);
    }
}
