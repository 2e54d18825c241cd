use std::any::type_name;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel::{self, Receiver};
use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::trace;

use crate::builder::Factory;
use crate::soft::{SoftHandle, SpareId};
use crate::stats::StatsCounters;
use crate::{PoolStats, Reclaimer, SparePoolBuilder};

type Spares<T> = HashMap<SpareId, Arc<SoftHandle<T>>>;

/// Upper bound for the capacity reserved up front, however high the spare limit.
const MAX_INITIAL_CAPACITY: usize = 1024;

/// A thread-safe pool that recycles released instances of `T` and creates new ones with a
/// factory when no spare is available.
///
/// Released instances become spares. A spare is retained softly: it stays available for
/// reuse until it is either acquired again, discarded by [`clear()`][Self::clear], or taken
/// away by the pool's [`Reclaimer`]. Callers never wait for an instance; if there is no
/// live spare, [`acquire()`][Self::acquire] falls through to the factory.
///
/// # Spare limit
///
/// The spare limit governs admission of released instances, not the steady-state size of
/// the pool. A release is admitted while the pool holds fewer spares than the limit. The
/// check is not atomic with the insertion, so concurrent releases may transiently exceed the
/// limit. A limit of zero admits every release.
///
/// # Example
///
/// ```rust
/// use spare_pool::SparePool;
///
/// let pool = SparePool::new(|| Vec::<u8>::with_capacity(1024));
///
/// let mut buffer = pool.acquire();
/// buffer.extend_from_slice(b"hello");
/// buffer.clear();
/// pool.release(buffer);
///
/// // The released buffer is recycled instead of allocating a new one.
/// let buffer = pool.acquire();
/// assert!(buffer.capacity() >= 1024);
/// assert_eq!(pool.stats().hits(), 1);
/// ```
///
/// # Thread safety
///
/// The pool is thread-safe ([`Send`] and [`Sync`]) for any `T` that is [`Send`]. Share it
/// between threads by reference or via [`Arc`].
pub struct SparePool<T> {
    factory: Factory<T>,

    spare_limit: usize,

    // Every mutation of the spares (drain, insert, remove, clear) happens under this lock.
    spares: Mutex<Spares<T>>,

    // Mirror of `spares.len()` that can be read without the lock for the admission check.
    // Only ever written while holding the `spares` lock.
    spare_count: AtomicUsize,

    reclaim_notifications: Receiver<SpareId>,

    reclaimer: Reclaimer<T>,

    stats: StatsCounters,
}

impl<T> SparePool<T> {
    /// Creates a pool without a spare limit that uses `factory` to create new instances.
    ///
    /// Use [`SparePool::builder()`] or [`SparePool::with_spare_limit()`] to configure
    /// a spare limit.
    ///
    /// # Example
    ///
    /// ```rust
    /// use spare_pool::SparePool;
    ///
    /// let pool = SparePool::new(String::new);
    /// assert_eq!(pool.spare_limit(), 0);
    /// ```
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new_inner(Box::new(factory), 0)
    }

    /// Creates a pool that retains at most (approximately) `spare_limit` spares.
    ///
    /// A `spare_limit` of zero means no limit.
    #[must_use]
    pub fn with_spare_limit<F>(factory: F, spare_limit: usize) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new_inner(Box::new(factory), spare_limit)
    }

    /// Creates a builder for configuring and constructing a [`SparePool`].
    pub fn builder() -> SparePoolBuilder<T> {
        SparePoolBuilder::new()
    }

    pub(crate) fn new_inner(factory: Factory<T>, spare_limit: usize) -> Self {
        let (notification_sender, reclaim_notifications) = channel::unbounded();

        Self {
            factory,
            spare_limit,
            spares: Mutex::new(HashMap::with_capacity(spare_limit.min(MAX_INITIAL_CAPACITY))),
            spare_count: AtomicUsize::new(0),
            reclaim_notifications,
            reclaimer: Reclaimer::new(notification_sender),
            stats: StatsCounters::default(),
        }
    }

    /// Hands out an instance, recycling a spare if one is available and creating a new one
    /// with the factory otherwise.
    ///
    /// Which spare is recycled is unspecified. A spare that was reclaimed is never returned.
    #[must_use]
    pub fn acquire(&self) -> T {
        let recycled = {
            let mut spares = self.spares.lock();
            self.drain_reclaimed(&mut spares);

            // Any spare will do, they are all equivalent.
            let candidate_id = spares.keys().next().copied();
            let candidate = candidate_id.and_then(|id| spares.remove(&id));

            self.spare_count.store(spares.len(), Ordering::Relaxed);

            candidate.and_then(|handle| {
                let value = handle.resolve();

                if value.is_none() {
                    trace!(
                        item_type = type_name::<T>(),
                        spare_id = handle.id(),
                        "chosen spare was reclaimed before it could be reused"
                    );
                }

                value
            })
        };

        if let Some(value) = recycled {
            self.stats.record_hit();
            return value;
        }

        self.stats.record_miss();

        // Outside the lock, construction may be arbitrarily expensive.
        (self.factory)()
    }

    /// Returns an instance to the pool so that it can be recycled by a later
    /// [`acquire()`][Self::acquire].
    ///
    /// Passing `None` does nothing. If the pool is at its spare limit, the instance is
    /// dropped instead of being retained.
    pub fn release(&self, value: impl Into<Option<T>>) {
        let Some(value) = value.into() else {
            return;
        };

        if !self.admits_spare() {
            self.stats.record_rejected();

            trace!(
                item_type = type_name::<T>(),
                spare_limit = self.spare_limit,
                "spare limit reached, released instance dropped"
            );

            return;
        }

        let handle = Arc::new(SoftHandle::new(value));

        {
            let mut spares = self.spares.lock();
            self.drain_reclaimed(&mut spares);

            spares.insert(handle.id(), Arc::clone(&handle));
            self.spare_count.store(spares.len(), Ordering::Relaxed);
        }

        // After releasing the spares lock, the two locks are never held together.
        self.reclaimer.track(&handle);
        self.stats.record_admitted();
    }

    /// Discards all spares. Instances that are currently acquired are not affected and may
    /// still be released to the pool afterwards.
    pub fn clear(&self) {
        let discarded = {
            let mut spares = self.spares.lock();
            self.spare_count.store(0, Ordering::Relaxed);
            mem::take(&mut *spares)
        };

        // Drop the spares after the lock is released, their `Drop` may use the pool.
        drop(discarded);
    }

    /// The advisory spare limit. Zero means no limit.
    #[must_use]
    pub fn spare_limit(&self) -> usize {
        self.spare_limit
    }

    /// Approximate number of spares held by the pool.
    ///
    /// Spares that have been reclaimed but not yet noticed by the pool are still counted.
    /// The pool notices them the next time an instance is acquired or released.
    #[must_use]
    pub fn spare_count(&self) -> usize {
        self.spare_count.load(Ordering::Relaxed)
    }

    /// Whether the pool (approximately) holds no spares.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spare_count() == 0
    }

    /// A snapshot of the activity counters of the pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Returns a [`Reclaimer`] that can take spares away from this pool.
    #[must_use]
    pub fn reclaimer(&self) -> Reclaimer<T> {
        self.reclaimer.clone()
    }

    fn admits_spare(&self) -> bool {
        self.spare_limit == 0 || self.spare_count() < self.spare_limit
    }

    // Caller must hold the spares lock, which the `&mut` proves. Removing an ID that is no
    // longer in the map is harmless, so draining is idempotent and may be skipped at will.
    fn drain_reclaimed(&self, spares: &mut Spares<T>) {
        for id in self.reclaim_notifications.try_iter() {
            if spares.remove(&id).is_some() {
                self.stats.record_reclaimed();

                trace!(
                    item_type = type_name::<T>(),
                    spare_id = id,
                    "reclaimed spare removed from pool"
                );
            }
        }
    }
}

impl<T> fmt::Debug for SparePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("spare_limit", &self.spare_limit)
            .field("spare_count", &self.spare_count())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::rc::Rc;
    use std::sync::atomic::AtomicU64;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SparePool<String>: Send, Sync);
    assert_not_impl_any!(SparePool<Rc<u8>>: Send, Sync);

    /// A value with an identity, so tests can tell recycled instances from fresh ones.
    #[derive(Debug, PartialEq, Eq)]
    struct Item(u64);

    fn counting_pool(spare_limit: usize) -> (SparePool<Item>, Arc<AtomicU64>) {
        let created = Arc::new(AtomicU64::new(0));

        let pool = SparePool::with_spare_limit(
            {
                let created = Arc::clone(&created);
                move || Item(created.fetch_add(1, Ordering::Relaxed))
            },
            spare_limit,
        );

        (pool, created)
    }

    #[test]
    fn fresh_pool_creates_distinct_instances() {
        let (pool, created) = counting_pool(0);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        assert_eq!(created.load(Ordering::Relaxed), 3);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn released_instance_is_recycled() {
        let (pool, created) = counting_pool(0);

        let item = pool.acquire();
        pool.release(item);

        assert_eq!(pool.acquire(), Item(0));
        assert_eq!(created.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn release_none_is_noop() {
        let (pool, _) = counting_pool(0);

        pool.release(None);

        assert!(pool.is_empty());
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn release_at_limit_drops_instance() {
        let (pool, created) = counting_pool(1);

        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);

        assert_eq!(pool.spare_count(), 1);
        assert_eq!(pool.stats().rejected(), 1);

        assert_eq!(pool.acquire(), Item(0));

        // Item(1) was not admitted, so the factory must run.
        assert_eq!(pool.acquire(), Item(2));
        assert_eq!(created.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn clear_discards_spares_but_not_acquired() {
        let (pool, _) = counting_pool(0);

        let kept = pool.acquire();
        pool.release(pool.acquire());
        assert_eq!(pool.spare_count(), 1);

        pool.clear();
        assert!(pool.is_empty());

        pool.release(kept);
        assert_eq!(pool.spare_count(), 1);
        assert_eq!(pool.acquire(), Item(0));
    }

    #[test]
    fn reclaimed_spare_is_never_returned() {
        let (pool, created) = counting_pool(0);
        let reclaimer = pool.reclaimer();

        pool.release(pool.acquire());
        assert_eq!(reclaimer.reclaim_all(), 1);

        // Still counted until the pool drains the notification.
        assert_eq!(pool.spare_count(), 1);

        assert_eq!(pool.acquire(), Item(1));
        assert_eq!(created.load(Ordering::Relaxed), 2);
        assert_eq!(pool.spare_count(), 0);
        assert_eq!(pool.stats().reclaimed(), 1);
    }

    #[test]
    fn release_drains_reclaimed_spares() {
        let (pool, _) = counting_pool(0);
        let reclaimer = pool.reclaimer();

        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        reclaimer.reclaim_all();

        pool.release(b);

        assert_eq!(pool.spare_count(), 1);
        assert_eq!(pool.acquire(), Item(1));
    }

    #[test]
    fn notification_for_acquired_spare_is_ignored() {
        let (pool, _) = counting_pool(0);

        let item = pool.acquire();
        pool.release(item);

        // Simulate a reclamation that lost the race against acquire: the handle was
        // already removed and resolved, but a notice for its ID still arrives.
        let handle_id = *pool.spares.lock().keys().next().unwrap();
        let item = pool.acquire();
        drop(pool.reclaimer.shared_sender_for_tests().send(handle_id));

        pool.release(item);
        assert_eq!(pool.spare_count(), 1);
        assert_eq!(pool.stats().reclaimed(), 0);
        assert_eq!(pool.acquire(), Item(0));
    }

    #[test]
    fn reclaimed_limit_slot_admits_again() {
        let (pool, _) = counting_pool(1);
        let reclaimer = pool.reclaimer();

        pool.release(pool.acquire());
        reclaimer.reclaim_all();

        // The acquire drains the reclaimed spare, which frees its slot under the limit.
        pool.release(pool.acquire());
        assert_eq!(pool.stats().rejected(), 0);
        assert_eq!(pool.spare_count(), 1);
    }

    #[test]
    fn stats_count_operations() {
        let (pool, _) = counting_pool(1);

        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);
        let _c = pool.acquire();

        let stats = pool.stats();
        assert_eq!(stats.misses(), 2);
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.admitted(), 1);
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.reclaimed(), 0);
    }

    #[test]
    fn debug_includes_limit_and_count() {
        let (pool, _) = counting_pool(4);
        pool.release(pool.acquire());

        let output = format!("{pool:?}");
        assert!(output.contains("spare_limit: 4"), "{output}");
        assert!(output.contains("spare_count: 1"), "{output}");
    }
}
