//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: counters, politeness and byte accounting saved in every checkpoint
//! - `UrlStatus`: terminal bookkeeping status of a URL (visited, failed, never crawl)

mod crawl_state;
mod url_status;

// Re-export main types
pub use crawl_state::CrawlState;
pub use url_status::UrlStatus;
