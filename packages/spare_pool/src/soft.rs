//! Soft retention of spare instances.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Identifies one soft handle for the lifetime of the process.
pub(crate) type SpareId = u64;

static NEXT_SPARE_ID: AtomicU64 = AtomicU64::new(0);

/// A handle that retains a spare instance until it is either resolved by the pool
/// or reclaimed by a [`Reclaimer`][crate::Reclaimer].
///
/// Once the referent is gone (for either reason) the handle is defunct and stays defunct.
/// Every handle has a unique ID, so the same instance is never retained twice by one pool.
pub(crate) struct SoftHandle<T> {
    id: SpareId,
    referent: Mutex<Option<T>>,
}

impl<T> SoftHandle<T> {
    pub(crate) fn new(value: T) -> Self {
        // Relaxed is enough, we only need uniqueness, not ordering with other memory.
        let id = NEXT_SPARE_ID.fetch_add(1, Ordering::Relaxed);

        Self {
            id,
            referent: Mutex::new(Some(value)),
        }
    }

    pub(crate) fn id(&self) -> SpareId {
        self.id
    }

    /// Takes the referent out of the handle if it is still live.
    pub(crate) fn resolve(&self) -> Option<T> {
        self.referent.lock().take()
    }

    /// Drops the referent if it is still live.
    ///
    /// Returns `true` if this call is the one that made the handle defunct. The value is
    /// dropped after the slot lock is released, so arbitrary `Drop` logic never runs under it.
    pub(crate) fn reclaim(&self) -> bool {
        let value = self.referent.lock().take();
        value.is_some()
    }

    pub(crate) fn is_live(&self) -> bool {
        self.referent.lock().is_some()
    }
}

impl<T> fmt::Debug for SoftHandle<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, nothing depends on it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("id", &self.id)
            .field("is_live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = SoftHandle::new(1_u32);
        let b = SoftHandle::new(1_u32);

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn resolve_takes_value_once() {
        let handle = SoftHandle::new("spare".to_string());

        assert!(handle.is_live());
        assert_eq!(handle.resolve().as_deref(), Some("spare"));
        assert!(!handle.is_live());
        assert_eq!(handle.resolve(), None);
    }

    #[test]
    fn reclaim_reports_only_first_transition() {
        let handle = SoftHandle::new(5_u64);

        assert!(handle.reclaim());
        assert!(!handle.reclaim());
        assert_eq!(handle.resolve(), None);
    }

    #[test]
    fn reclaim_after_resolve_is_noop() {
        let handle = SoftHandle::new(5_u64);

        assert_eq!(handle.resolve(), Some(5));
        assert!(!handle.reclaim());
    }

    #[test]
    fn reclaim_drops_referent() {
        struct DropCounter(Arc<AtomicUsize>);

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let handle = SoftHandle::new(DropCounter(Arc::clone(&drops)));

        assert!(handle.reclaim());
        assert_eq!(drops.load(Ordering::Relaxed), 1);
    }
}
