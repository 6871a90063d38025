//! Sliding failure window (§3 `SlidingFailureWindow`, §4.6).
//!
//! For each node, an ordered set of failure timestamps within a window
//! `W`. Entries older than `now - W` are pruned on every access so the
//! count always reflects only failures within the current window.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// Time-bounded set of failure timestamps for a single node.
///
/// Backed by a `Vec` kept in insertion order; pruning walks from the
/// front since timestamps are pushed in non-decreasing order by
/// [`CircuitBreaker`](crate::circuit::breaker::CircuitBreaker), which is
/// the only writer.
#[derive(Debug, Clone, Default)]
pub struct SlidingFailureWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl SlidingFailureWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure at `now`.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.timestamps.push(now);
    }

    /// Drop entries older than `now - window`, then return the count of
    /// entries remaining (§3 invariant: "entries older than `now - W`
    /// are pruned on every access").
    pub fn prune_and_count(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let cutoff = now - ChronoDuration::from_std(window).unwrap_or(ChronoDuration::zero());
        self.timestamps.retain(|ts| *ts >= cutoff);
        self.timestamps.len()
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_drops_entries_older_than_window() {
        let mut window = SlidingFailureWindow::new();
        let base = Utc::now();
        window.record(base);
        window.record(base + ChronoDuration::seconds(10));

        let count = window.prune_and_count(base + ChronoDuration::seconds(61), Duration::from_secs(60));
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_window_counts_zero() {
        let mut window = SlidingFailureWindow::new();
        assert_eq!(window.prune_and_count(Utc::now(), Duration::from_secs(60)), 0);
    }

    #[test]
    fn clear_empties_the_window() {
        let mut window = SlidingFailureWindow::new();
        let now = Utc::now();
        window.record(now);
        window.clear();
        assert_eq!(window.prune_and_count(now, Duration::from_secs(60)), 0);
    }
}
