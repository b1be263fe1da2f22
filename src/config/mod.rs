//! Configuration module for Forage
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use forage::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("forage.toml")).unwrap();
//! println!("Crawling {}", config.crawler.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, IndexConfig, SearchConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
