//! Statistics from the crawl checkpoint
//!
//! This module reads the checkpoint database without starting a crawl and
//! renders what it holds, and renders the summary of a finished crawl run.

use crate::config::Config;
use crate::crawler::{CrawlSummary, Frontier, PendingCounts, StopReason};
use crate::robots::RobotsRules;
use crate::storage::{CheckpointStore, PageStore, SqliteCheckpointStore};
use crate::url::PageClass;
use crate::ForageError;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Snapshot of a stored crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointStatistics {
    /// Pending entries per page class
    pub pending: PendingCounts,

    pub visited: usize,
    pub failed: usize,
    pub never_crawl: usize,

    /// Iterations run across all sessions
    pub iteration: u64,

    /// Iteration at which the frontier is reordered next
    pub next_reorder_iteration: u64,

    /// Current politeness delay in seconds
    pub crawl_delay: f64,

    /// Bytes accounted in the checkpoint
    pub total_bytes_crawled: u64,

    /// Pages currently on disk
    pub pages_on_disk: usize,

    /// When the checkpoint was written
    pub saved_at: Option<DateTime<Utc>>,
}

impl CheckpointStatistics {
    pub fn total_pending(&self) -> usize {
        self.pending.product_detail + self.pending.product_list + self.pending.other
    }
}

/// Loads statistics from the configured checkpoint database
///
/// # Returns
///
/// * `Ok(Some(stats))` - A checkpoint exists
/// * `Ok(None)` - No crawl has been checkpointed yet
pub fn load_statistics(config: &Config) -> Result<Option<CheckpointStatistics>, ForageError> {
    if !config.storage.checkpoint_path.exists() {
        return Ok(None);
    }
    let store = SqliteCheckpointStore::new(&config.storage.checkpoint_path)?;
    let Some(checkpoint) = store.load()? else {
        return Ok(None);
    };

    let frontier = Frontier::from_snapshot(
        &config.crawler,
        RobotsRules::allow_all(),
        checkpoint.frontier,
    );
    let pages = PageStore::open(&config.storage.data_dir, &config.storage.ledger_path)?;

    Ok(Some(CheckpointStatistics {
        pending: frontier.pending_by_class(),
        visited: frontier.visited_count(),
        failed: frontier.failed_count(),
        never_crawl: frontier.never_crawl_count(),
        iteration: checkpoint.state.iteration,
        next_reorder_iteration: checkpoint.state.next_reorder_iteration,
        crawl_delay: checkpoint.state.politeness.crawl_delay,
        total_bytes_crawled: checkpoint.state.total_bytes_crawled,
        pages_on_disk: pages.page_count()?,
        saved_at: store.saved_at()?,
    }))
}

/// Formats checkpoint statistics for the terminal
pub fn render_statistics(stats: &CheckpointStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Checkpoint ===\n");

    if let Some(saved_at) = stats.saved_at {
        let _ = writeln!(out, "Saved at: {}", saved_at.to_rfc3339());
    }
    let _ = writeln!(out, "Iterations: {}", stats.iteration);
    let _ = writeln!(out, "Next reorder at iteration: {}", stats.next_reorder_iteration);
    let _ = writeln!(out, "Crawl delay: {:.2}s\n", stats.crawl_delay);

    let _ = writeln!(out, "Pending ({}):", stats.total_pending());
    for (class, count) in [
        (PageClass::ProductDetail, stats.pending.product_detail),
        (PageClass::ProductList, stats.pending.product_list),
        (PageClass::Other, stats.pending.other),
    ] {
        let _ = writeln!(out, "  {}: {}", class.label(), count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Visited: {}", stats.visited);
    let _ = writeln!(out, "Failed: {}", stats.failed);
    let _ = writeln!(out, "Never crawl: {}\n", stats.never_crawl);

    let _ = writeln!(
        out,
        "Stored pages: {} ({})",
        stats.pages_on_disk,
        format_bytes(stats.total_bytes_crawled)
    );
    out
}

/// Prints checkpoint statistics to stdout
pub fn print_statistics(stats: &CheckpointStatistics) {
    print!("{}", render_statistics(stats));
}

/// Formats the summary of a finished crawl run
pub fn render_crawl_summary(summary: &CrawlSummary) -> String {
    let reason = match summary.stop_reason {
        StopReason::FrontierEmpty => "frontier exhausted",
        StopReason::IterationLimit => "iteration limit reached",
        StopReason::Interrupted => "interrupted",
    };
    let c = &summary.counters;

    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Finished ({}) ===\n", reason);
    let _ = writeln!(out, "This run:");
    let _ = writeln!(out, "  Iterations: {} ({} skipped)", c.iterations, c.skipped);
    let _ = writeln!(out, "  Pages saved: {}", c.pages_saved);
    let _ = writeln!(out, "  Rate limited: {}", c.rate_limited);
    let _ = writeln!(out, "  Excluded: {}", c.excluded);
    let _ = writeln!(
        out,
        "  Transient failures: {} ({} driver faults, {} given up)",
        c.transient_failures, c.driver_faults, c.gave_up
    );
    let _ = writeln!(out, "  Checkpoints: {}\n", c.checkpoints);

    let _ = writeln!(out, "Frontier:");
    let _ = writeln!(out, "  Pending: {}", summary.pending);
    let _ = writeln!(out, "  Visited: {}", summary.visited);
    let _ = writeln!(out, "  Failed: {}", summary.failed);
    let _ = writeln!(out, "  Never crawl: {}\n", summary.never_crawl);

    let _ = writeln!(
        out,
        "Total crawled: {}, final delay {:.2}s",
        format_bytes(summary.total_bytes_crawled),
        summary.crawl_delay
    );
    out
}

pub fn print_crawl_summary(summary: &CrawlSummary) {
    print!("{}", render_crawl_summary(summary));
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::RunCounters;

    fn sample_stats() -> CheckpointStatistics {
        CheckpointStatistics {
            pending: PendingCounts {
                product_detail: 5,
                product_list: 2,
                other: 1,
            },
            visited: 40,
            failed: 3,
            never_crawl: 7,
            iteration: 55,
            next_reorder_iteration: 60,
            crawl_delay: 6.25,
            total_bytes_crawled: 3 * 1024 * 1024,
            pages_on_disk: 40,
            saved_at: None,
        }
    }

    #[test]
    fn test_render_statistics() {
        let text = render_statistics(&sample_stats());
        assert!(text.contains("Pending (8):"));
        assert!(text.contains("  product-detail: 5"));
        assert!(text.contains("Never crawl: 7"));
        assert!(text.contains("Crawl delay: 6.25s"));
        assert!(text.contains("Stored pages: 40 (3.0 MiB)"));
        assert!(!text.contains("Saved at"));
    }

    #[test]
    fn test_render_crawl_summary() {
        let summary = CrawlSummary {
            stop_reason: StopReason::Interrupted,
            counters: RunCounters {
                iterations: 12,
                pages_saved: 9,
                ..RunCounters::default()
            },
            pending: 4,
            visited: 9,
            failed: 0,
            never_crawl: 1,
            total_bytes_crawled: 512,
            crawl_delay: 5.0,
        };
        let text = render_crawl_summary(&summary);
        assert!(text.starts_with("=== Crawl Finished (interrupted) ==="));
        assert!(text.contains("Pages saved: 9"));
        assert!(text.contains("Total crawled: 512 B, final delay 5.00s"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }
}
