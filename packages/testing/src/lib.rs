#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, examples and benchmarks of the pool packages.

use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// Pool tests hammer shared locks from many threads. A deadlock there would otherwise hang
/// the whole test run, so the watchdog turns it into a test failure instead. The limit is
/// 10 seconds, or 60 seconds under Miri where synchronization is dramatically slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the test function is
/// executed directly so that mutation testing can observe hanging mutations.
///
/// # Panics
///
/// Panics if the test exceeds the time limit. Panics from the test itself are propagated.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let time_limit = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (result_tx, result_rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        // If this fails, the watchdog already gave up waiting.
        drop(result_tx.send(test_fn()));
    });

    match result_rx.recv_timeout(time_limit) {
        Ok(result) => {
            test_thread.join().expect("test thread finished, join cannot fail");
            result
        }
        Err(RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {time_limit:?}, is a pool lock deadlocked?");
        }
        Err(RecvTimeoutError::Disconnected) => match test_thread.join() {
            Ok(()) => panic!("test thread exited without reporting a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// A value with a unique identity, produced by a [`CountingFactory`].
///
/// Pool tests use the serial number to tell recycled instances apart from freshly created
/// ones without relying on memory addresses.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tracked {
    serial: u64,
}

impl Tracked {
    /// The serial number assigned by the factory that created this value, starting at 0.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// A pool factory that counts how often it has been called.
///
/// Clones share the same counter, so one clone can be moved into a pool while another one
/// stays with the test to observe it.
///
/// # Example
///
/// ```rust
/// use testing::CountingFactory;
///
/// let factory = CountingFactory::new();
/// let make = factory.as_fn();
///
/// assert_eq!(make().serial(), 0);
/// assert_eq!(make().serial(), 1);
/// assert_eq!(factory.created(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CountingFactory {
    created: Arc<AtomicU64>,
}

impl CountingFactory {
    /// Creates a factory that has not created anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the next [`Tracked`] value.
    #[must_use]
    pub fn create(&self) -> Tracked {
        Tracked {
            serial: self.created.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A closure suitable for handing to a pool as its factory.
    ///
    /// The closure owns a clone of the factory and does not borrow `self`.
    pub fn as_fn(&self) -> impl Fn() -> Tracked + Send + Sync + use<> {
        let factory = self.clone();
        move || factory.create()
    }

    /// How many values this factory (or any of its clones) has created.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}
