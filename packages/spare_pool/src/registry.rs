use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use foldhash::{HashMap, HashMapExt};
use parking_lot::RwLock;
use tracing::debug;

use crate::{Error, Keyed, PoolKey, SparePool};

/// The type-erased view of a registered pool.
trait RegisteredPool: Send + Sync {
    fn clear(&self);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Send + 'static> RegisteredPool for SparePool<T> {
    fn clear(&self) {
        Self::clear(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Maps [`PoolKey`]s to [`SparePool`]s so that unrelated parts of a program can obtain and
/// release pooled objects of a given kind without passing individual pools around.
///
/// Create one registry near the root of the program and share it by reference (or via
/// [`Arc`]) with the components that need it. Pools must be registered explicitly with
/// [`reference_pool()`][Self::reference_pool] or [`install()`][Self::install]; looking up a
/// key that has no pool is an error, never an implicit registration.
///
/// # Example
///
/// ```rust
/// use spare_pool::{Error, PoolKey, PoolRegistry};
///
/// let registry = PoolRegistry::new();
/// let key = PoolKey::of::<Vec<u8>>();
///
/// assert!(matches!(
///     registry.get::<Vec<u8>>(&key),
///     Err(Error::NotRegistered { .. })
/// ));
///
/// registry
///     .reference_pool(key, || Vec::<u8>::with_capacity(512))
///     .unwrap();
///
/// let buffer = registry.get::<Vec<u8>>(&key).unwrap();
/// registry.putback(buffer, &key).unwrap();
/// ```
///
/// # Thread safety
///
/// The registry is thread-safe ([`Send`] and [`Sync`]). Lookups take a shared lock and
/// proceed in parallel, registrations take an exclusive lock. The registry lock is always
/// released before the pool itself is used, so the two are never held together.
pub struct PoolRegistry {
    pools: RwLock<HashMap<PoolKey, Arc<dyn RegisteredPool>>>,
}

impl PoolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Acquires an instance from the pool registered for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `key` was not declared for `T` and
    /// [`Error::NotRegistered`] if no pool is registered for `key`.
    pub fn get<T: Send + 'static>(&self, key: &PoolKey) -> Result<T, Error> {
        Ok(self.pool::<T>(key)?.acquire())
    }

    /// Acquires an instance from the pool registered for `key`, wrapped together with the key
    /// so it can later [release itself][Keyed::release] to the same pool.
    ///
    /// # Errors
    ///
    /// Same as [`get()`][Self::get].
    pub fn get_keyed<T: Send + 'static>(&self, key: &PoolKey) -> Result<Keyed<T>, Error> {
        Ok(Keyed::with_key(self.get(key)?, *key))
    }

    /// Returns the pool registered for `key`.
    ///
    /// The returned pool stays usable even if it is later replaced in the registry, though a
    /// replaced pool has its spares cleared.
    ///
    /// # Errors
    ///
    /// Same as [`get()`][Self::get].
    pub fn pool<T: Send + 'static>(&self, key: &PoolKey) -> Result<Arc<SparePool<T>>, Error> {
        ensure_key_for::<T>(key)?;

        // The read guard is a temporary, dropped before the pool is touched.
        let pool = self
            .pools
            .read()
            .get(key)
            .map(Arc::clone)
            .ok_or(Error::NotRegistered { key: *key })?;

        downcast(pool, key)
    }

    /// Registers a new pool without a spare limit for `key`, using `factory` to create
    /// instances.
    ///
    /// If a pool was already registered for `key`, it is replaced. The previous pool has its
    /// spares cleared (they are not merged into the new pool) and is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `key` was not declared for `T`.
    pub fn reference_pool<T, F>(
        &self,
        key: PoolKey,
        factory: F,
    ) -> Result<Option<Arc<SparePool<T>>>, Error>
    where
        T: Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.install(key, SparePool::new(factory))
    }

    /// Registers an already configured pool for `key`.
    ///
    /// Replacement works the same as with [`reference_pool()`][Self::reference_pool].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `key` was not declared for `T`.
    pub fn install<T: Send + 'static>(
        &self,
        key: PoolKey,
        pool: SparePool<T>,
    ) -> Result<Option<Arc<SparePool<T>>>, Error> {
        ensure_key_for::<T>(&key)?;

        let pool: Arc<dyn RegisteredPool> = Arc::new(pool);
        let previous = self.pools.write().insert(key, pool);

        // The write guard is gone, so clearing does not nest the registry and pool locks.
        let Some(previous) = previous else {
            debug!(%key, "pool registered");
            return Ok(None);
        };

        previous.clear();
        debug!(%key, "pool replaced, spares of the previous pool discarded");

        Ok(downcast(previous, &key).ok())
    }

    /// Returns an instance to the pool registered for `key`.
    ///
    /// This is what [`Poolable::release()`][crate::Poolable::release] and
    /// [`Keyed::release()`] forward to.
    ///
    /// There is no absent value to put back: `value` is a `T`, never an empty slot. Callers
    /// holding an `Option<T>` can pass it to [`SparePool::release()`] on the pool returned by
    /// [`pool()`][Self::pool], which treats `None` as a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `key` was not declared for `T` and
    /// [`Error::NotRegistered`] if no pool is registered for `key`. The value is dropped
    /// in both cases.
    pub fn putback<T: Send + 'static>(&self, value: T, key: &PoolKey) -> Result<(), Error> {
        self.pool::<T>(key)?.release(value);
        Ok(())
    }

    /// Whether a pool is registered for `key`.
    #[must_use]
    pub fn contains(&self, key: &PoolKey) -> bool {
        self.pools.read().contains_key(key)
    }

    /// Number of registered pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Whether no pools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }
}

fn ensure_key_for<T: 'static>(key: &PoolKey) -> crate::Result<()> {
    if key.is_for::<T>() {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            key: *key,
            requested: type_name::<T>(),
        })
    }
}

fn downcast<T: Send + 'static>(
    pool: Arc<dyn RegisteredPool>,
    key: &PoolKey,
) -> crate::Result<Arc<SparePool<T>>> {
    // Keys are declared for one type and checked on registration, so this only fails
    // if the caller asked for a different type than the key was declared for.
    pool.into_any()
        .downcast::<SparePool<T>>()
        .map_err(|_| Error::TypeMismatch {
            key: *key,
            requested: type_name::<T>(),
        })
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.pools.read().keys().map(ToString::to_string).collect();

        f.debug_struct(type_name::<Self>())
            .field("keys", &keys)
            .finish()
    }
}
