use thiserror::Error;

use crate::PoolKey;

/// Errors that can occur when constructing pools or resolving them through a
/// [`PoolRegistry`][crate::PoolRegistry].
///
/// Every error means the operation did not happen. No pool state is changed on an error path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller supplied an argument that cannot be used to construct a pool,
    /// such as a builder without a factory.
    #[error("invalid argument: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// No pool has been registered for the key. Pools are never created implicitly,
    /// use [`PoolRegistry::reference_pool()`][crate::PoolRegistry::reference_pool] first.
    #[error("no pool is registered for {key}")]
    NotRegistered {
        /// The key that was looked up.
        key: PoolKey,
    },

    /// The Rust type used in a registry operation disagrees with the type the key was
    /// declared for.
    #[error("the pool for {key} cannot be used with values of type {requested}")]
    TypeMismatch {
        /// The key the operation targeted.
        key: PoolKey,

        /// Name of the type the caller tried to use with the key.
        requested: &'static str,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
