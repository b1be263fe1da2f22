use crate::config::CrawlerConfig;
use crate::crawler::{Politeness, ReorderSummary};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Everything the crawl loop mutates besides the frontier itself
///
/// One value of this type is owned by the coordinator and handed to the
/// checkpoint store on every save; nothing else keeps a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlState {
    /// Number of dequeued entries so far, including skipped ones
    pub iteration: u64,

    /// Adaptive inter-request delay and its feedback counters
    pub politeness: Politeness,

    /// Size of the last reorder window
    pub reorder_interval: u64,

    /// Iteration at which the frontier is reordered next
    pub next_reorder_iteration: u64,

    /// Page store hash -> URL for every saved page
    pub url_hashes: BTreeMap<String, String>,

    /// Bytes written to the page store
    pub total_bytes_crawled: u64,

    /// `total_bytes_crawled` at the previous checkpoint
    pub bytes_at_last_save: u64,
}

impl CrawlState {
    /// Creates the state for a crawl that starts from the seed URL
    pub fn fresh(config: &CrawlerConfig, now: DateTime<Utc>) -> Self {
        Self {
            iteration: 0,
            politeness: Politeness::new(config.initial_crawl_delay, now),
            reorder_interval: config.reorder_interval,
            next_reorder_iteration: config.reorder_interval,
            url_hashes: BTreeMap::new(),
            total_bytes_crawled: 0,
            bytes_at_last_save: 0,
        }
    }

    /// Returns true when the frontier should be reordered before the next dequeue
    pub fn reorder_due(&self) -> bool {
        self.iteration >= self.next_reorder_iteration
    }

    /// Schedules the next reorder relative to the current iteration
    pub fn schedule_reorder(&mut self, summary: &ReorderSummary) {
        self.reorder_interval = summary.reorder_interval;
        self.next_reorder_iteration = self.iteration + summary.reorder_interval;
    }

    /// Records a page written to the page store
    pub fn record_page(&mut self, url_hash: String, url: String, bytes: u64) {
        self.url_hashes.insert(url_hash, url);
        self.total_bytes_crawled += bytes;
    }

    /// Bytes crawled since the previous checkpoint
    pub fn bytes_since_last_save(&self) -> u64 {
        self.total_bytes_crawled.saturating_sub(self.bytes_at_last_save)
    }

    /// Marks the current byte total as checkpointed
    pub fn mark_saved(&mut self) {
        self.bytes_at_last_save = self.total_bytes_crawled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> CrawlerConfig {
        CrawlerConfig {
            base_url: "https://example.org".to_string(),
            max_retries: 3,
            save_interval: 10,
            initial_crawl_delay: 2.0,
            resume_min_delay: 5.0,
            reorder_interval: 500,
            page_load_timeout: 15,
            detail_path_prefix: "/product/".to_string(),
        }
    }

    #[test]
    fn test_fresh_state() {
        let state = CrawlState::fresh(&create_test_config(), Utc::now());
        assert_eq!(state.iteration, 0);
        assert_eq!(state.politeness.crawl_delay, 2.0);
        assert_eq!(state.next_reorder_iteration, 500);
        assert!(!state.reorder_due());
    }

    #[test]
    fn test_schedule_reorder() {
        let mut state = CrawlState::fresh(&create_test_config(), Utc::now());
        state.iteration = 700;
        assert!(state.reorder_due());

        state.schedule_reorder(&ReorderSummary {
            product_detail: 3,
            product_list: 2,
            other: 10,
            reorder_interval: 6,
        });

        assert_eq!(state.reorder_interval, 6);
        assert_eq!(state.next_reorder_iteration, 706);
        assert!(!state.reorder_due());
    }

    #[test]
    fn test_byte_accounting() {
        let mut state = CrawlState::fresh(&create_test_config(), Utc::now());
        state.record_page("aa".to_string(), "https://example.org/a".to_string(), 100);
        state.record_page("bb".to_string(), "https://example.org/b".to_string(), 50);
        assert_eq!(state.total_bytes_crawled, 150);
        assert_eq!(state.bytes_since_last_save(), 150);

        state.mark_saved();
        assert_eq!(state.bytes_since_last_save(), 0);
        assert_eq!(state.url_hashes.len(), 2);
    }
}
