use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Forage
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Origin of the crawled site, without a trailing slash. Also the seed URL.
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of failed attempts tolerated before a URL is marked failed
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Successful fetches between checkpoint saves
    #[serde(rename = "save-interval", default = "default_save_interval")]
    pub save_interval: u32,

    /// Delay before each fetch on a fresh crawl (seconds)
    #[serde(rename = "initial-crawl-delay", default = "default_crawl_delay")]
    pub initial_crawl_delay: f64,

    /// Lower bound applied to the restored delay when resuming (seconds)
    #[serde(rename = "resume-min-delay", default = "default_crawl_delay")]
    pub resume_min_delay: f64,

    /// Iterations before the first queue reorder on a fresh crawl
    #[serde(rename = "reorder-interval", default = "default_reorder_interval")]
    pub reorder_interval: u64,

    /// Per-page fetch timeout (seconds)
    #[serde(rename = "page-load-timeout", default = "default_page_load_timeout")]
    pub page_load_timeout: u64,

    /// Path prefix identifying product-detail pages
    #[serde(rename = "detail-path-prefix", default = "default_detail_prefix")]
    pub detail_path_prefix: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (Contact: {})",
            self.crawler_name, self.crawler_version, self.contact_email
        )
    }
}

/// Where crawl output is persisted
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per fetched page
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// Append-only `hash<TAB>url` ledger
    #[serde(rename = "ledger-path")]
    pub ledger_path: PathBuf,

    /// SQLite checkpoint database
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: PathBuf,
}

/// Index build configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Tab-delimited extracted field records
    #[serde(default = "default_index_input")]
    pub input: PathBuf,

    /// Directory receiving the index artifacts
    #[serde(rename = "output-dir", default = "default_index_output")]
    pub output_dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            input: default_index_input(),
            output_dir: default_index_output(),
        }
    }
}

/// Query configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Number of results printed per query
    #[serde(rename = "top-k", default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_max_retries() -> u32 {
    10
}

fn default_save_interval() -> u32 {
    10
}

fn default_crawl_delay() -> f64 {
    5.0
}

fn default_reorder_interval() -> u64 {
    500
}

fn default_page_load_timeout() -> u64 {
    15
}

fn default_detail_prefix() -> String {
    "/product/".to_string()
}

fn default_index_input() -> PathBuf {
    PathBuf::from("_merged_data.csv")
}

fn default_index_output() -> PathBuf {
    PathBuf::from("indexed_data")
}

fn default_top_k() -> usize {
    10
}
