//! Coalescer statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of coalescer activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Head changes merged into pending state.
    pub submitted: u64,
    /// Head changes rejected because the coalescer was closed.
    pub rejected: u64,
    /// Coalesced batches handed to the notifee.
    pub dispatched: u64,
    /// Batches the notifee reported an error for.
    pub dispatch_failures: u64,
    /// Tipsets dropped by revert/apply cancellation.
    pub cancelled: u64,
}

impl CoalescerStats {
    /// Returns the average number of head changes folded into each dispatch.
    pub fn coalescing_ratio(&self) -> f64 {
        if self.dispatched == 0 {
            0.0
        } else {
            self.submitted as f64 / self.dispatched as f64
        }
    }
}

/// Counters shared between the public handle and the scheduler task.
#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    pub(crate) submitted: AtomicU64,
    pub(crate) rejected: AtomicU64,
    pub(crate) dispatched: AtomicU64,
    pub(crate) dispatch_failures: AtomicU64,
    pub(crate) cancelled: AtomicU64,
}

impl StatsInner {
    pub(crate) fn incr(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CoalescerStats {
        CoalescerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_without_dispatches() {
        assert_eq!(CoalescerStats::default().coalescing_ratio(), 0.0);
    }

    #[test]
    fn test_snapshot() {
        let inner = StatsInner::default();
        StatsInner::incr(&inner.submitted, 6);
        StatsInner::incr(&inner.dispatched, 2);

        let stats = inner.snapshot();
        assert_eq!(stats.submitted, 6);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.coalescing_ratio(), 3.0);
    }
}
