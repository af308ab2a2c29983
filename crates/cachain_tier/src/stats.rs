// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Hit and miss counters shared by every backend.
///
/// Counters only grow, except through [`reset`](Self::reset), which backends expose
/// only as part of an explicit reset operation.
#[derive(Debug, Default)]
pub struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a read that found an entry.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a read that found nothing.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of recorded hits.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of recorded misses.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Sets both counters back to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Running request latency for backends that talk to a remote engine.
#[derive(Debug, Default)]
pub struct LatencyStats {
    total_nanos: AtomicU64,
    requests: AtomicU64,
}

impl LatencyStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one request that took `elapsed`.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of recorded requests.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Returns the average request time, or zero when nothing was recorded.
    #[must_use]
    pub fn average(&self) -> Duration {
        let requests = self.requests();
        if requests == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed) / requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_count_and_reset() {
        let counters = Counters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.hits(), 2);
        assert_eq!(counters.misses(), 1);

        counters.reset();
        assert_eq!(counters.hits(), 0);
        assert_eq!(counters.misses(), 0);
    }

    #[test]
    fn latency_average_of_nothing_is_zero() {
        assert_eq!(LatencyStats::new().average(), Duration::ZERO);
    }

    #[test]
    fn latency_average() {
        let stats = LatencyStats::new();
        stats.record(Duration::from_millis(10));
        stats.record(Duration::from_millis(30));
        assert_eq!(stats.requests(), 2);
        assert_eq!(stats.average(), Duration::from_millis(20));
    }

    #[test]
    fn counters_are_shared_across_threads() {
        let counters = std::sync::Arc::new(Counters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = std::sync::Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_hit();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }
        assert_eq!(counters.hits(), 4000);
    }
}
