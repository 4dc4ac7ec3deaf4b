//! Normalized records and the store holding them.

mod cache_key;
mod record;
mod store;
mod value;

use std::fmt;

pub use self::cache_key::CacheKeyInfo;
pub use self::cache_key::CacheKeyResolver;
pub use self::cache_key::ResolveCacheKey;
pub use self::record::ChangedKeys;
pub use self::record::MUTATION_ROOT;
pub use self::record::QUERY_ROOT;
pub use self::record::Record;
pub use self::record::RecordKey;
pub use self::record::RecordSet;
pub use self::record::SUBSCRIPTION_ROOT;
pub use self::store::ChangeSet;
pub use self::store::RecordStore;
pub(crate) use self::store::DEFAULT_NOTIFICATION_CAPACITY;
pub use self::value::FieldValue;
pub use self::value::Scalar;

/// A value that is either already computed, or computed on demand.
pub enum Resolvable<T> {
    Ready(T),
    Pending(Box<dyn FnOnce() -> T + Send>),
}

impl<T> Resolvable<T> {
    pub fn pending(f: impl FnOnce() -> T + Send + 'static) -> Self {
        Resolvable::Pending(Box::new(f))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Resolvable::Ready(_))
    }

    /// Returns the value, computing it if needed.
    pub fn get(self) -> T {
        match self {
            Resolvable::Ready(value) => value,
            Resolvable::Pending(f) => f(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Resolvable<U>
    where
        T: 'static,
    {
        match self {
            Resolvable::Ready(value) => Resolvable::Ready(f(value)),
            Resolvable::Pending(pending) => Resolvable::pending(move || f(pending())),
        }
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Resolvable::Ready(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Resolvable::Pending(_) => f.write_str("Pending"),
        }
    }
}
