use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Contract for objects held in a [`KeyedCache`](super::KeyedCache) and delivered
/// to listeners.
///
/// Listeners never see the cached instance: every delivery carries the result of
/// [`deep_copy`](Cacheable::deep_copy), so a listener can neither corrupt shared
/// state nor observe later mutations.
pub trait Cacheable: Send + Sync + 'static {
    /// Cache key type.
    type Key: Copy + Eq + Hash + Ord + Debug + Display + Send + Sync + 'static;

    /// Immutable key of this object.
    fn key(&self) -> Self::Key;

    /// Independent copy sharing no mutable state with `self`.
    fn deep_copy(&self) -> Self;
}
