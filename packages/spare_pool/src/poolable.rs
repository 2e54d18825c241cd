use std::ops::{Deref, DerefMut};

use crate::{Error, PoolKey, PoolRegistry};

/// A type whose instances know which registered pool they belong to and can release
/// themselves to it.
///
/// By default an instance belongs to the default pool of its own type,
/// [`PoolKey::of::<Self>()`][PoolKey::of]. Types that are pooled under a labeled key record
/// that key when they are constructed and return it from [`pool_key()`][Self::pool_key].
///
/// # Example
///
/// ```rust
/// use spare_pool::{PoolKey, PoolRegistry, Poolable};
///
/// #[derive(Default)]
/// struct Particle {
///     position: (f32, f32),
/// }
///
/// impl Poolable for Particle {}
///
/// let registry = PoolRegistry::new();
/// registry
///     .reference_pool(PoolKey::of::<Particle>(), Particle::default)
///     .unwrap();
///
/// let mut particle = registry.get::<Particle>(&PoolKey::of::<Particle>()).unwrap();
/// particle.position = (1.0, 2.0);
///
/// // Consumes the particle, it cannot be used after it is returned to the pool.
/// particle.release(&registry).unwrap();
/// ```
pub trait Poolable: Send + Sized + 'static {
    /// The key of the pool this instance must be returned to.
    fn pool_key(&self) -> PoolKey {
        PoolKey::of::<Self>()
    }

    /// Returns this instance to the pool identified by [`pool_key()`][Self::pool_key].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the recorded key was declared for a type other
    /// than `Self`, and [`Error::NotRegistered`] if no pool is registered for the key.
    /// The instance is dropped in both cases.
    fn release(self, registry: &PoolRegistry) -> Result<(), Error> {
        let key = self.pool_key();
        registry.putback(self, &key)
    }
}

/// A pooled value accompanied by the key of the pool it belongs to.
///
/// This attaches the self-release convention of [`Poolable`] to any type without requiring
/// the type itself to carry a key. The wrapper dereferences to the value.
///
/// # Example
///
/// ```rust
/// use spare_pool::{PoolKey, PoolRegistry};
///
/// let registry = PoolRegistry::new();
/// let key = PoolKey::named::<String>("log lines");
/// registry.reference_pool(key, String::new).unwrap();
///
/// let mut line = registry.get_keyed::<String>(&key).unwrap();
/// line.push_str("request served");
/// line.clear();
///
/// line.release(&registry).unwrap();
/// ```
#[derive(Debug)]
pub struct Keyed<T> {
    value: T,
    key: PoolKey,
}

impl<T: 'static> Keyed<T> {
    /// Wraps a value that belongs to the default pool of its type.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_key(value, PoolKey::of::<T>())
    }
}

impl<T> Keyed<T> {
    /// Wraps a value that belongs to the pool identified by `key`.
    #[must_use]
    pub fn with_key(value: T, key: PoolKey) -> Self {
        Self { value, key }
    }

    /// The key of the pool this value must be returned to.
    #[must_use]
    pub fn key(&self) -> PoolKey {
        self.key
    }

    /// Unwraps the value, forgetting which pool it belongs to.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Send + 'static> Keyed<T> {
    /// Returns the value to the pool it belongs to.
    ///
    /// # Errors
    ///
    /// Same as [`Poolable::release()`].
    pub fn release(self, registry: &PoolRegistry) -> Result<(), Error> {
        registry.putback(self.value, &self.key)
    }
}

impl<T> Deref for Keyed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Keyed<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
