//! Forage: a polite single-site crawler with a tf-idf search engine
//!
//! This crate crawls one content site under adaptive politeness constraints,
//! checkpoints its frontier so a crawl can resume after a crash, and builds an
//! inverted index with tf-idf ranking over the extracted page text.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Forage operations
#[derive(Debug, Error)]
pub enum ForageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Index error: {0}")]
    Index(#[from] search::IndexError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Forage operations
pub type Result<T> = std::result::Result<T, ForageError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, Frontier, Politeness};
pub use search::{Index, SearchEngine};
pub use state::{CrawlState, UrlStatus};
