use std::any::type_name;
use std::fmt;

use crate::{Error, SparePool};

pub(crate) type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Builder for creating an instance of [`SparePool`].
///
/// The factory is mandatory, whereas the spare limit is optional and defaults to 0,
/// meaning the pool admits every released instance.
///
/// # Examples
///
/// ```
/// use spare_pool::SparePool;
///
/// let pool = SparePool::builder()
///     .factory(|| String::with_capacity(256))
///     .spare_limit(16)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.spare_limit(), 16);
/// ```
#[must_use]
pub struct SparePoolBuilder<T> {
    factory: Option<Factory<T>>,
    spare_limit: usize,
}

impl<T> SparePoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            factory: None,
            spare_limit: 0,
        }
    }

    /// Sets the function used to create a new instance whenever the pool has no spare to hand
    /// out. The factory is called without holding any pool lock.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Sets the advisory spare limit.
    ///
    /// Released instances are only retained while the pool holds fewer spares than this.
    /// The check is not atomic with the insertion, so concurrent releases may briefly exceed
    /// the limit. Zero (the default) means no limit.
    pub fn spare_limit(mut self, spare_limit: usize) -> Self {
        self.spare_limit = spare_limit;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no factory has been set.
    pub fn build(self) -> Result<SparePool<T>, Error> {
        let factory = self.factory.ok_or_else(|| Error::InvalidArgument {
            problem: format!(
                "a factory for {} must be set using .factory() before calling .build()",
                type_name::<T>()
            ),
        })?;

        Ok(SparePool::new_inner(factory, self.spare_limit))
    }
}

impl<T> fmt::Debug for SparePoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("has_factory", &self.factory.is_some())
            .field("spare_limit", &self.spare_limit)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn build_without_factory_fails() {
        let result = SparePoolBuilder::<u32>::new().spare_limit(4).build();

        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn defaults_to_unbounded() {
        let pool = SparePoolBuilder::new().factory(|| 0_u32).build().unwrap();

        assert_eq!(pool.spare_limit(), 0);
    }

    #[test]
    fn spare_limit_is_applied() {
        let pool = SparePoolBuilder::new()
            .factory(|| 0_u32)
            .spare_limit(3)
            .build()
            .unwrap();

        assert_eq!(pool.spare_limit(), 3);
    }

    #[test]
    fn debug_reports_configuration() {
        let builder = SparePoolBuilder::new().factory(|| 0_u8).spare_limit(9);

        let output = format!("{builder:?}");
        assert!(output.contains("has_factory: true"), "{output}");
        assert!(output.contains("spare_limit: 9"), "{output}");
    }
}
