//! Output module for terminal reports
//!
//! This module handles:
//! - Statistics read from the crawl checkpoint
//! - The summary printed when a crawl run ends
//! - Search result listings

mod results;
mod stats;

pub use results::{print_results, render_results};
pub use stats::{
    load_statistics, print_crawl_summary, print_statistics, render_crawl_summary,
    render_statistics, CheckpointStatistics,
};
