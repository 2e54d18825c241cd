//! Activity counters of a pool.
//!
//! Each pool keeps its own counters for [`PoolStats`] snapshots. The same activity is also
//! published process-wide as `nm` events, summed over all pools, so that it shows up in
//! `nm::Report::collect()` next to the metrics of other packages.

use std::sync::atomic::{AtomicU64, Ordering};

use nm::Event;

thread_local! {
    /// Acquires served by a recycled spare.
    static HITS: Event = Event::builder()
        .name("spare_pool_hits")
        .build();

    /// Acquires that had to invoke the factory.
    static MISSES: Event = Event::builder()
        .name("spare_pool_misses")
        .build();

    /// Released instances retained as spares.
    static ADMITTED: Event = Event::builder()
        .name("spare_pool_admitted")
        .build();

    /// Released instances dropped because the pool was at its spare limit.
    static REJECTED: Event = Event::builder()
        .name("spare_pool_rejected")
        .build();

    /// Reclaimed spares removed from pool bookkeeping.
    static RECLAIMED: Event = Event::builder()
        .name("spare_pool_reclaimed")
        .build();
}

/// A point-in-time snapshot of the activity counters of a [`SparePool`][crate::SparePool].
///
/// All counters start at zero when the pool is created and only ever increase. They are
/// updated without synchronization with each other, so a snapshot taken while other threads
/// use the pool may be slightly inconsistent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    hits: u64,
    misses: u64,
    admitted: u64,
    rejected: u64,
    reclaimed: u64,
}

impl PoolStats {
    /// Number of acquires that were served by a recycled spare.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of acquires that had to invoke the factory, either because there were no spares
    /// or because the chosen spare had been reclaimed in the meantime.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of released instances that were retained as spares.
    #[must_use]
    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Number of released instances that were dropped because the pool was at its spare limit.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Number of reclaimed spares the pool has removed from its bookkeeping.
    #[must_use]
    pub fn reclaimed(&self) -> u64 {
        self.reclaimed
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    admitted: AtomicU64,
    rejected: AtomicU64,
    reclaimed: AtomicU64,
}

// Relaxed ordering everywhere: these are monotonic counters with no synchronization needs.
impl StatsCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        HITS.with(|event| event.observe_once());
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        MISSES.with(|event| event.observe_once());
    }

    pub(crate) fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        ADMITTED.with(|event| event.observe_once());
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        REJECTED.with(|event| event.observe_once());
    }

    pub(crate) fn record_reclaimed(&self) {
        self.reclaimed.fetch_add(1, Ordering::Relaxed);
        RECLAIMED.with(|event| event.observe_once());
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use nm::Report;

    use super::*;

    fn published_count(name: &str) -> u64 {
        Report::collect()
            .events()
            .find(|event| event.name() == name)
            .map_or(0, |event| event.count())
    }

    #[test]
    fn new_counters_are_zero() {
        let counters = StatsCounters::default();

        assert_eq!(counters.snapshot(), PoolStats::default());
    }

    #[test]
    fn snapshot_reflects_records() {
        let counters = StatsCounters::default();

        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_admitted();
        counters.record_admitted();
        counters.record_admitted();
        counters.record_rejected();
        counters.record_reclaimed();

        let stats = counters.snapshot();
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.admitted(), 3);
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.reclaimed(), 1);
    }

    #[test]
    fn records_are_published_as_events() {
        // Other tests in this process publish too, so only growth can be asserted.
        let hits_before = published_count("spare_pool_hits");
        let rejected_before = published_count("spare_pool_rejected");

        let counters = StatsCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_rejected();

        assert!(published_count("spare_pool_hits") >= hits_before + 2);
        assert!(published_count("spare_pool_rejected") > rejected_before);
    }
}
