//! Adaptive politeness delay
//!
//! A multiplicative backoff/recovery controller: sustained 429 responses
//! stretch the delay, a sustained run of handled responses shrinks it. The
//! controller only reacts once per window (or immediately on a burst of 429s),
//! so a single outlier never moves the delay.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Minimum time between two adjustments, unless a 429 burst forces one
pub const ADJUSTMENT_WINDOW_SECS: i64 = 30;

/// More 429s than this force an adjustment before the window elapses
pub const RATE_LIMIT_BURST: u32 = 4;

/// More 429s than this within a window increase the delay
pub const BACKOFF_THRESHOLD: u32 = 2;

/// More handled responses than this within a window decrease the delay
pub const RECOVERY_THRESHOLD: u32 = 20;

pub const BACKOFF_FACTOR: f64 = 1.25;
pub const RECOVERY_FACTOR: f64 = 0.75;

/// Upper bound of the delay after any adjustment (seconds)
pub const MAX_CRAWL_DELAY: f64 = 15.0;

/// Lower bound of the delay after any adjustment (seconds)
pub const MIN_CRAWL_DELAY: f64 = 0.5;

/// A delay change made by [`Politeness::adjust`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayAdjustment {
    pub from: f64,
    pub to: f64,
    pub too_many_requests: u32,
    pub successes: u32,
}

/// Politeness controller state
#[derive(Debug, Clone, PartialEq)]
pub struct Politeness {
    /// Current wait before each fetch (seconds)
    pub crawl_delay: f64,

    /// HTTP 429 responses since the last adjustment
    pub too_many_requests_count: u32,

    /// Handled responses since the last adjustment
    pub success_count: u32,

    /// When the delay last changed
    pub last_adjustment: DateTime<Utc>,
}

impl Politeness {
    pub fn new(crawl_delay: f64, now: DateTime<Utc>) -> Self {
        Self {
            crawl_delay,
            too_many_requests_count: 0,
            success_count: 0,
            last_adjustment: now,
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_rate_limited(&mut self) {
        self.too_many_requests_count += 1;
    }

    /// The delay as a `Duration`; a corrupt (negative or NaN) delay sleeps zero
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.crawl_delay).unwrap_or(Duration::ZERO)
    }

    /// Raises the delay to at least `floor` seconds
    pub fn clamp_min(&mut self, floor: f64) {
        if !(self.crawl_delay >= floor) {
            self.crawl_delay = floor;
        }
    }

    /// Runs one controller step; called once per fetch
    ///
    /// Returns the change when the delay was adjusted. Both counters and the
    /// adjustment timestamp reset only when the delay actually changes branch.
    pub fn adjust(&mut self, now: DateTime<Utc>) -> Option<DelayAdjustment> {
        let window_elapsed =
            (now - self.last_adjustment).num_seconds() >= ADJUSTMENT_WINDOW_SECS;
        if !window_elapsed && self.too_many_requests_count <= RATE_LIMIT_BURST {
            return None;
        }

        let from = self.crawl_delay;
        if self.too_many_requests_count > BACKOFF_THRESHOLD {
            self.crawl_delay =
                (self.crawl_delay * BACKOFF_FACTOR).clamp(MIN_CRAWL_DELAY, MAX_CRAWL_DELAY);
        } else if self.success_count > RECOVERY_THRESHOLD {
            self.crawl_delay =
                (self.crawl_delay * RECOVERY_FACTOR).clamp(MIN_CRAWL_DELAY, MAX_CRAWL_DELAY);
        } else {
            return None;
        }

        let adjustment = DelayAdjustment {
            from,
            to: self.crawl_delay,
            too_many_requests: self.too_many_requests_count,
            successes: self.success_count,
        };
        self.too_many_requests_count = 0;
        self.success_count = 0;
        self.last_adjustment = now;
        Some(adjustment)
    }
}
