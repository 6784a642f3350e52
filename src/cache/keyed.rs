//! # Concurrent keyed cache.
//!
//! [`KeyedCache`] maps keys to `Arc<Mutex<T>>` cells held in a [`DashMap`].
//! The map shard lock is only held long enough to clone the cell handle; the
//! per-key [`Mutex`] is what serializes read-modify-write sequences.
//!
//! ## Rules
//! - `lock(key)` is the only way to mutate a cached object.
//! - [`insert_locked`](KeyedCache::insert_locked) publishes an object whose lock is
//!   already held, so no other task can touch it before the inserter is done.
//! - A guard obtained before `remove` keeps the detached object alive; writes
//!   through it are no longer visible in the cache.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::Cacheable;

/// Concurrent map of per-key locked objects.
pub struct KeyedCache<T: Cacheable> {
    entries: DashMap<T::Key, Arc<Mutex<T>>>,
}

impl<T: Cacheable> Default for KeyedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Cacheable> KeyedCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Inserts `object` under its own key.
    ///
    /// Returns the object back if the key is already present.
    pub fn insert(&self, object: T) -> Result<(), T> {
        match self.entries.entry(object.key()) {
            Entry::Occupied(_) => Err(object),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(object)));
                Ok(())
            }
        }
    }

    /// Inserts `object` with its lock already held by the returned guard.
    ///
    /// Returns the key back if it is already present.
    pub async fn insert_locked(&self, object: T) -> Result<OwnedMutexGuard<T>, T::Key> {
        let key = object.key();
        let cell = Arc::new(Mutex::new(object));
        // fresh cell, uncontended
        let guard = Arc::clone(&cell).lock_owned().await;
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(key),
            Entry::Vacant(slot) => {
                slot.insert(cell);
                Ok(guard)
            }
        }
    }

    /// Removes the object stored under `key`, returning a copy of its last state.
    pub async fn remove(&self, key: &T::Key) -> Option<T> {
        let (_, cell) = self.entries.remove(key)?;
        let guard = cell.lock().await;
        Some(guard.deep_copy())
    }

    /// Acquires the exclusive lock of `key`.
    ///
    /// Waits only for other holders of the same key.
    pub async fn lock(&self, key: &T::Key) -> Option<OwnedMutexGuard<T>> {
        let cell = self.cell(key)?;
        Some(cell.lock_owned().await)
    }

    /// Returns a deep copy of the object under `key`, taken under its lock.
    pub async fn get_copy(&self, key: &T::Key) -> Option<T> {
        let guard = self.lock(key).await?;
        Some(guard.deep_copy())
    }

    /// True if `key` is present.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Sorted snapshot of the keys currently present.
    pub fn keys(&self) -> Vec<T::Key> {
        let mut keys: Vec<T::Key> = self.entries.iter().map(|e| *e.key()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cell(&self, key: &T::Key) -> Option<Arc<Mutex<T>>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }
}
