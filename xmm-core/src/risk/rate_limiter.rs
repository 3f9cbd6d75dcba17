//! Rate Limiting - Dual Fixed Windows
//!
//! Keeps the engine under venue request limits with two independent windows,
//! typically one short (per second) and one long (per minute).
//!
//! ## Algorithm
//!
//! ```text
//! window: start=0s, duration=1s, limit=3
//!
//! t=0.1s  batch of 2   count=2  breached=false
//! t=0.4s  batch of 1   count=3  breached=true   <- order actions dropped
//! t=0.9s  roll         count=3  breached=true
//! t=1.0s  roll         count=0  breached=false  (start=1.0s)
//! ```
//!
//! The limiter is an admission gate, not a queue: while breached, new order
//! actions are dropped for that cycle. Queries are still admitted and counted.
//!
//! ## Usage
//!
//! ```
//! use xmm_core::config::RateLimitConfig;
//! use xmm_core::risk::RateLimiter;
//!
//! let mut limiter = RateLimiter::new(RateLimitConfig::standard(), 0);
//! limiter.roll(1_000);
//! if !limiter.is_breached() {
//!     limiter.record(2); // two actions sent
//! }
//! ```

use crate::config::RateLimitConfig;
use tracing::{debug, warn};

/// One fixed counting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub count: u64,
    pub start_us: u64,
    pub duration_us: u64,
    pub limit: u64,
    pub breached: bool,
}

impl Window {
    pub fn new(duration_us: u64, limit: u64, start_us: u64) -> Self {
        Self {
            count: 0,
            start_us,
            duration_us,
            limit,
            breached: false,
        }
    }

    /// Reset when the window has elapsed, then refresh the breach flag
    ///
    /// Returns true when the window rolled over.
    pub fn roll(&mut self, now_us: u64) -> bool {
        let rolled = now_us >= self.start_us.saturating_add(self.duration_us);
        if rolled {
            self.count = 0;
            self.start_us = now_us;
        }
        self.breached = self.count >= self.limit;
        rolled
    }

    pub fn record(&mut self, n: u64) {
        self.count = self.count.saturating_add(n);
        self.breached = self.count >= self.limit;
    }
}

/// Two-window request counter with a breach predicate
#[derive(Debug, Clone)]
pub struct RateLimiter {
    short: Window,
    long: Window,
    /// Actions admitted over the limiter's lifetime
    total_recorded: u64,
    /// Order actions dropped while breached
    total_dropped: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, now_us: u64) -> Self {
        Self {
            short: Window::new(config.short_window_us, config.short_limit, now_us),
            long: Window::new(config.long_window_us, config.long_limit, now_us),
            total_recorded: 0,
            total_dropped: 0,
        }
    }

    /// Advance both windows to `now_us`
    pub fn roll(&mut self, now_us: u64) {
        let was_breached = self.is_breached();
        let short_rolled = self.short.roll(now_us);
        let long_rolled = self.long.roll(now_us);
        if (short_rolled || long_rolled) && was_breached && !self.is_breached() {
            debug!("Rate limit windows rolled over, order actions re-enabled");
        }
    }

    /// Count `n` submitted actions against both windows
    pub fn record(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        let was_breached = self.is_breached();
        self.short.record(n);
        self.long.record(n);
        self.total_recorded += n;
        if !was_breached && self.is_breached() {
            warn!(
                "Rate limit reached: short {}/{}, long {}/{}",
                self.short.count, self.short.limit, self.long.count, self.long.limit
            );
        }
    }

    /// Note order actions dropped by the admission gate
    pub fn record_dropped(&mut self, n: u64) {
        self.total_dropped += n;
    }

    #[inline]
    pub fn is_breached(&self) -> bool {
        self.short.breached || self.long.breached
    }

    pub fn short_window(&self) -> &Window {
        &self.short
    }

    pub fn long_window(&self) -> &Window {
        &self.long
    }

    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(short_limit: u64, long_limit: u64) -> RateLimitConfig {
        RateLimitConfig {
            short_window_us: 1_000,
            short_limit,
            long_window_us: 10_000,
            long_limit,
        }
    }

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let mut limiter = RateLimiter::new(config(5, 100), 0);
        limiter.record(4);
        assert!(!limiter.is_breached());
        assert_eq!(limiter.short_window().count, 4);
        assert_eq!(limiter.long_window().count, 4);
    }

    #[test]
    fn test_rate_limiter_breaches_at_limit() {
        let mut limiter = RateLimiter::new(config(5, 100), 0);
        for _ in 0..5 {
            limiter.record(1);
        }
        assert!(limiter.is_breached());
        assert_eq!(limiter.total_recorded(), 5);
    }

    #[test]
    fn test_short_window_reset() {
        let mut limiter = RateLimiter::new(config(3, 100), 0);
        limiter.record(3);
        limiter.roll(999);
        assert!(limiter.is_breached(), "window not yet elapsed");

        limiter.roll(1_000);
        assert!(!limiter.is_breached());
        assert_eq!(limiter.short_window().count, 0);
        assert_eq!(limiter.short_window().start_us, 1_000);
        assert_eq!(limiter.long_window().count, 3, "long window keeps counting");
    }

    #[test]
    fn test_long_window_breach_outlives_short_window() {
        let mut limiter = RateLimiter::new(config(3, 4), 0);
        limiter.record(2);
        limiter.roll(1_500);
        limiter.record(2);
        assert!(!limiter.short_window().breached);
        assert!(limiter.long_window().breached);
        assert!(limiter.is_breached());

        limiter.roll(10_000);
        assert!(!limiter.is_breached());
        assert_eq!(limiter.long_window().count, 0);
    }

    #[test]
    fn test_dropped_counter() {
        let mut limiter = RateLimiter::new(config(1, 1), 0);
        limiter.record(1);
        limiter.record_dropped(2);
        assert_eq!(limiter.total_dropped(), 2);
    }
}
