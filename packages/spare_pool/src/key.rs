use std::any::{TypeId, type_name};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Identifies one pool in a [`PoolRegistry`][crate::PoolRegistry].
///
/// A key is declared for exactly one item type. By default a type owns a single pool
/// ([`PoolKey::of()`]), but a label can be attached to register several independent pools
/// of the same type ([`PoolKey::named()`]).
///
/// # Example
///
/// ```rust
/// use spare_pool::PoolKey;
///
/// let default_key = PoolKey::of::<Vec<u8>>();
/// let scratch_key = PoolKey::named::<Vec<u8>>("scratch");
///
/// assert_ne!(default_key, scratch_key);
/// assert!(scratch_key.is_for::<Vec<u8>>());
/// assert!(!scratch_key.is_for::<String>());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PoolKey {
    type_id: TypeId,

    // Only used for diagnostics. Not part of the identity of the key.
    type_name: &'static str,

    label: Option<&'static str>,
}

impl PoolKey {
    /// The key of the default pool for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            label: None,
        }
    }

    /// The key of a labeled pool for `T`, distinct from the default pool and from pools
    /// with other labels.
    #[must_use]
    pub fn named<T: 'static>(label: &'static str) -> Self {
        Self {
            label: Some(label),
            ..Self::of::<T>()
        }
    }

    /// Whether this key was declared for values of type `T`.
    #[must_use]
    pub fn is_for<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Name of the item type the key was declared for.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The label of the key, if it is not the default key for its type.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }
}

impl PartialEq for PoolKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.label == other.label
    }
}

impl Eq for PoolKey {}

impl Hash for PoolKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.label.hash(state);
    }
}

impl Display for PoolKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.label {
            Some(label) => write!(f, "{}#{label}", self.type_name),
            None => f.write_str(self.type_name),
        }
    }
}
