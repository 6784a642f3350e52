//! Keyed in-memory cache with per-key exclusive locking.
//!
//! ## Contents
//! - [`Cacheable`] contract for cached objects (key + explicit deep copy)
//! - [`KeyedCache`] concurrent map of per-key locked cells
//!
//! ## Locking discipline
//! ```text
//! lock(key) ──► OwnedMutexGuard<T>  (read ─► compute ─► write ─► notify sync listeners)
//!                     │
//!                  drop(guard) ──► deferred delivery (pooled / buffered)
//! ```
//! Locks are per key: unrelated keys never contend. Key enumeration goes through
//! the concurrent map and never blocks on a held key lock.

mod cacheable;
mod keyed;

pub use cacheable::Cacheable;
pub use keyed::KeyedCache;
