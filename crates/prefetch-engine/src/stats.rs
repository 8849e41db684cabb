//! Request counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for requests issued by an engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    route_requests: AtomicU64,
    shared_requests: AtomicU64,
    fallbacks: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub route_requests: u64,
    pub shared_requests: u64,
    pub fallbacks: u64,
    pub failures: u64,
}

impl EngineStats {
    pub(crate) fn record_route_request(&self) {
        self.route_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shared_request(&self) {
        self.shared_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            route_requests: self.route_requests.load(Ordering::Relaxed),
            shared_requests: self.shared_requests.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = EngineStats::default();
        stats.record_route_request();
        stats.record_route_request();
        stats.record_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.route_requests, 2);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.shared_requests, 0);
        assert_eq!(snapshot.fallbacks, 0);
    }
}
