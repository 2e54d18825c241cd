use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use tracing::debug;

use crate::soft::{SoftHandle, SpareId};

/// Below this many tracked handles we do not bother pruning defunct entries.
const MIN_PRUNE_THRESHOLD: usize = 64;

/// Takes spare instances away from a [`SparePool`][crate::SparePool], standing in for the
/// memory manager of a garbage-collected runtime.
///
/// A pool retains its spares softly: they remain available for reuse until something decides
/// the memory is better spent elsewhere. That something is the reclaimer. Call
/// [`reclaim()`][Self::reclaim] or [`reclaim_all()`][Self::reclaim_all] from whatever
/// component observes memory pressure (an allocator hook, a periodic trimmer, a cache budget)
/// and the reclaimed spares are dropped immediately.
///
/// The pool is told about reclaimed spares through a notification channel that it drains
/// the next time a spare is acquired or released, so reclaiming never blocks on the pool.
///
/// # Example
///
/// ```rust
/// use spare_pool::SparePool;
///
/// let pool = SparePool::new(|| Vec::<u8>::with_capacity(4096));
/// let reclaimer = pool.reclaimer();
///
/// pool.release(pool.acquire());
/// pool.release(pool.acquire());
///
/// // Memory is tight, drop everything the pool is holding on to.
/// assert_eq!(reclaimer.reclaim_all(), 1);
/// ```
///
/// # Thread safety
///
/// The reclaimer is cheap to clone and is thread-safe ([`Send`] and [`Sync`]) for any `T`
/// that is [`Send`]. All clones operate on the spares of the same pool.
pub struct Reclaimer<T> {
    shared: Arc<ReclaimerShared<T>>,
}

struct ReclaimerShared<T> {
    // Weak, so that a spare removed from the pool is not kept alive by the reclaimer.
    handles: Mutex<TrackedHandles<T>>,

    notifications: Sender<SpareId>,
}

struct TrackedHandles<T> {
    handles: Vec<Weak<SoftHandle<T>>>,

    // When `handles` grows to this length, defunct entries are pruned before pushing more.
    prune_at: usize,
}

impl<T> Reclaimer<T> {
    pub(crate) fn new(notifications: Sender<SpareId>) -> Self {
        Self {
            shared: Arc::new(ReclaimerShared {
                handles: Mutex::new(TrackedHandles {
                    handles: Vec::new(),
                    prune_at: MIN_PRUNE_THRESHOLD,
                }),
                notifications,
            }),
        }
    }

    /// Registers a newly admitted spare so that it can later be reclaimed.
    pub(crate) fn track(&self, handle: &Arc<SoftHandle<T>>) {
        let mut tracked = self.shared.handles.lock();

        if tracked.handles.len() >= tracked.prune_at {
            tracked.handles.retain(|weak| is_reclaimable(weak));
            tracked.prune_at = tracked
                .handles
                .len()
                .saturating_mul(2)
                .max(MIN_PRUNE_THRESHOLD);
        }

        tracked.handles.push(Arc::downgrade(handle));
    }

    /// Reclaims up to `max` spares, oldest first, and returns how many were reclaimed.
    ///
    /// Each reclaimed spare is dropped before this method returns. Spares that are acquired
    /// concurrently with this call are not reclaimed, so the result may be lower than the
    /// number of spares the pool appeared to hold.
    pub fn reclaim(&self, max: usize) -> usize {
        let victims = {
            let mut tracked = self.shared.handles.lock();

            let mut victims = Vec::new();
            let mut scanned: usize = 0;

            // Scanning stops as soon as we have enough victims. Defunct entries beyond that
            // point are left for `track()` to prune.
            for weak in &tracked.handles {
                if victims.len() >= max {
                    break;
                }

                scanned = scanned.saturating_add(1);

                if let Some(handle) = weak.upgrade().filter(|handle| handle.is_live()) {
                    victims.push(handle);
                }
            }

            // Every scanned entry is either a victim or already defunct.
            tracked.handles.drain(..scanned);

            victims
        };

        // Values are dropped outside the tracking lock, so their `Drop` may touch the pool.
        let mut reclaimed: usize = 0;

        for handle in victims {
            if handle.reclaim() {
                reclaimed = reclaimed.saturating_add(1);

                // The receiver is owned by the pool. If the pool is gone, so is any need
                // to hear about this.
                drop(self.shared.notifications.send(handle.id()));
            }
        }

        debug!(
            item_type = type_name::<T>(),
            reclaimed, "reclaimed spares from pool"
        );

        reclaimed
    }

    /// Reclaims every spare the pool currently holds and returns how many were reclaimed.
    pub fn reclaim_all(&self) -> usize {
        self.reclaim(usize::MAX)
    }

    /// Number of handles currently tracked, live or not yet pruned.
    #[cfg(test)]
    pub(crate) fn tracked_len(&self) -> usize {
        self.shared.handles.lock().handles.len()
    }

    /// Lets tests inject notifications that race with the pool.
    #[cfg(test)]
    pub(crate) fn shared_sender_for_tests(&self) -> &Sender<SpareId> {
        &self.shared.notifications
    }
}

fn is_reclaimable<T>(weak: &Weak<SoftHandle<T>>) -> bool {
    weak.upgrade().is_some_and(|handle| handle.is_live())
}

impl<T> Clone for Reclaimer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Reclaimer<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, nothing depends on it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracked = self.shared.handles.lock().handles.len();

        f.debug_struct(type_name::<Self>())
            .field("tracked", &tracked)
            .finish_non_exhaustive()
    }
}
