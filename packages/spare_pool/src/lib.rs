#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! An object pool that prefers recycling released instances over creating new ones, without
//! letting spare instances pile up forever.
//!
//! This package provides [`SparePool`], a thread-safe pool for values of one type. Callers
//! [`acquire()`][SparePool::acquire] an instance and [`release()`][SparePool::release] it when
//! done. Released instances become spares that later acquires recycle. When there is no spare
//! to recycle, the pool calls the factory it was created with; callers never wait.
//!
//! Spares are retained softly. Instead of an eviction algorithm (LRU, TTL), each pool comes
//! with a [`Reclaimer`] that whoever observes memory pressure can use to take spares away.
//! The pool learns about reclaimed spares through a notification channel that it drains
//! lazily, the next time an instance is acquired or released.
//!
//! A [`PoolRegistry`] maps [`PoolKey`]s to pools so that unrelated parts of a program can
//! obtain and release objects of a given kind without passing each pool around. Values can
//! carry the key of their own pool and release themselves, either by implementing
//! [`Poolable`] or by being wrapped in [`Keyed`].
//!
//! # Example
//!
//! ```rust
//! use spare_pool::SparePool;
//!
//! // Retain at most (approximately) 8 spare buffers.
//! let pool = SparePool::with_spare_limit(|| Vec::<u8>::with_capacity(64 * 1024), 8);
//!
//! let mut buffer = pool.acquire();
//! buffer.extend_from_slice(b"payload");
//!
//! buffer.clear();
//! pool.release(buffer);
//!
//! // Recycled, not allocated again.
//! let buffer = pool.acquire();
//! assert!(buffer.capacity() >= 64 * 1024);
//!
//! // Under memory pressure, the spares can be dropped.
//! pool.release(buffer);
//! pool.reclaimer().reclaim_all();
//! ```
//!
//! # Registry
//!
//! ```rust
//! use spare_pool::{Keyed, PoolKey, PoolRegistry};
//!
//! let registry = PoolRegistry::new();
//! let key = PoolKey::named::<String>("headers");
//!
//! registry.reference_pool(key, || String::with_capacity(128)).unwrap();
//!
//! let mut header: Keyed<String> = registry.get_keyed(&key).unwrap();
//! header.push_str("content-type: text/plain");
//! header.clear();
//!
//! // Returns to the pool registered for `key`.
//! header.release(&registry).unwrap();
//! ```
//!
//! # Spare limit
//!
//! The spare limit of a pool is advisory. It governs whether a released instance is admitted
//! as a spare, not how many spares the pool holds: admission is checked without holding the
//! pool lock, so concurrent releases may exceed the limit briefly, and admitted spares may be
//! reclaimed at any time.

mod builder;
mod error;
mod key;
mod pool;
mod poolable;
mod reclaimer;
mod registry;
mod soft;
mod stats;

pub use builder::SparePoolBuilder;
pub use error::Error;
pub(crate) use error::Result;
pub use key::PoolKey;
pub use pool::SparePool;
pub use poolable::{Keyed, Poolable};
pub use reclaimer::Reclaimer;
pub use registry::PoolRegistry;
pub use stats::PoolStats;
