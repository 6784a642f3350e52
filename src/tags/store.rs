//! # Data tag store.
//!
//! Same locking discipline as the supervised-entity store: every write holds the
//! tag's key lock through synchronous notification and hands deferred delivery
//! off after release.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;

use crate::cache::KeyedCache;
use crate::entity::{EntityKey, SupervisionEvent};
use crate::error::SupervisionError;
use crate::events::{CacheEventKind, EventSet};
use crate::listeners::CacheDispatcher;
use crate::liveness::TagValue;
use crate::supervision::{Rejection, Verdict};

use super::DataTag;

/// Data tags indexed by their supervising entities.
pub struct TagStore {
    cache: KeyedCache<DataTag>,
    index: DashMap<EntityKey, BTreeSet<u64>>,
    dispatcher: Arc<CacheDispatcher<DataTag>>,
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TagStore {
    pub fn new() -> Self {
        Self {
            cache: KeyedCache::new(),
            index: DashMap::new(),
            dispatcher: Arc::new(CacheDispatcher::new("tags")),
        }
    }

    /// Listener registry of the tag store.
    pub fn dispatcher(&self) -> &Arc<CacheDispatcher<DataTag>> {
        &self.dispatcher
    }

    /// Adds a tag; raises `UPDATE_ACCEPTED`.
    pub async fn insert(&self, tag: DataTag) -> Result<(), SupervisionError> {
        let guard = self.cache.insert_locked(tag).await.map_err(|id| {
            SupervisionError::AlreadyConfigured {
                what: "tag",
                id: id.to_string(),
            }
        })?;
        let id = guard.id();
        for key in guard.supervising_entities() {
            self.index.entry(key).or_default().insert(id);
        }

        self.notify_and_release(guard, CacheEventKind::UpdateAccepted.into())
            .await;
        Ok(())
    }

    pub async fn remove(&self, id: u64) -> Result<DataTag, SupervisionError> {
        let tag = self
            .cache
            .remove(&id)
            .await
            .ok_or(SupervisionError::UnknownTag { id })?;
        for key in tag.supervising_entities() {
            if let Some(mut ids) = self.index.get_mut(&key) {
                ids.remove(&id);
            }
            self.index.remove_if(&key, |_, ids| ids.is_empty());
        }
        Ok(tag)
    }

    /// Deep copy of a tag.
    pub async fn get(&self, id: u64) -> Result<DataTag, SupervisionError> {
        self.cache
            .get_copy(&id)
            .await
            .ok_or(SupervisionError::UnknownTag { id })
    }

    pub fn contains(&self, id: u64) -> bool {
        self.cache.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Ids of the tags supervised by `key`, sorted.
    pub fn tags_of(&self, key: EntityKey) -> Vec<u64> {
        self.index
            .get(&key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Applies a new value unless it is older than the recorded one.
    ///
    /// Raises `UPDATE_ACCEPTED` when applied.
    pub async fn update_value(
        &self,
        id: u64,
        value: impl Into<TagValue>,
        ts: u64,
    ) -> Result<Verdict, SupervisionError> {
        let mut guard = self.lock(id).await?;
        if let Some(recorded) = guard.value_time() {
            if ts < recorded {
                tracing::debug!(tag = id, ts, recorded, "stale tag value rejected");
                return Ok(Verdict::Rejected(Rejection::Stale {
                    recorded,
                    supplied: ts,
                }));
            }
        }
        guard.value = Some(value.into());
        guard.value_time = Some(ts);

        let events = EventSet::from(CacheEventKind::UpdateAccepted);
        self.notify_and_release(guard, events).await;
        Ok(Verdict::Accepted(events))
    }

    /// Records a supervising entity's status on a tag and raises `SUPERVISION_CHANGE`.
    ///
    /// Returns `false` when the tag already holds a newer event for that entity.
    pub async fn apply_supervision(
        &self,
        id: u64,
        event: &SupervisionEvent,
    ) -> Result<bool, SupervisionError> {
        let mut guard = self.lock(id).await?;
        if !guard.record_supervision(event) {
            return Ok(false);
        }
        self.notify_and_release(guard, CacheEventKind::SupervisionChange.into())
            .await;
        Ok(true)
    }

    async fn lock(&self, id: u64) -> Result<OwnedMutexGuard<DataTag>, SupervisionError> {
        self.cache
            .lock(&id)
            .await
            .ok_or(SupervisionError::UnknownTag { id })
    }

    async fn notify_and_release(&self, guard: OwnedMutexGuard<DataTag>, events: EventSet) {
        let pending = self.dispatcher.notify_synchronous(events, &guard).await;
        drop(guard);
        self.dispatcher.deliver(pending).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, SupervisionStatus};

    #[tokio::test]
    async fn stale_values_are_rejected() {
        let store = TagStore::new();
        store.insert(DataTag::new(1, "T", 1, 2)).await.unwrap();

        let v = store.update_value(1, 10_i64, 2000).await.unwrap();
        assert!(matches!(v, Verdict::Accepted(_)));
        let v = store.update_value(1, 11_i64, 1999).await.unwrap();
        assert_eq!(
            v,
            Verdict::Rejected(Rejection::Stale {
                recorded: 2000,
                supplied: 1999
            })
        );

        let tag = store.get(1).await.unwrap();
        assert_eq!(tag.value(), Some(&TagValue::Int(10)));
        assert_eq!(tag.value_time(), Some(2000));
    }

    #[tokio::test]
    async fn index_follows_insert_and_remove() {
        let store = TagStore::new();
        store.insert(DataTag::new(2, "B", 1, 5)).await.unwrap();
        store.insert(DataTag::new(1, "A", 1, 6).with_sub_equipment(9)).await.unwrap();

        assert_eq!(store.tags_of(EntityKey::process(1)), vec![1, 2]);
        assert_eq!(store.tags_of(EntityKey::equipment(5)), vec![2]);
        assert_eq!(store.tags_of(EntityKey::sub_equipment(9)), vec![1]);

        store.remove(1).await.unwrap();
        assert_eq!(store.tags_of(EntityKey::process(1)), vec![2]);
        assert!(store.tags_of(EntityKey::sub_equipment(9)).is_empty());
        assert_eq!(
            store.remove(1).await.unwrap_err(),
            SupervisionError::UnknownTag { id: 1 }
        );
    }

    #[tokio::test]
    async fn supervision_is_recorded_per_entity() {
        let store = TagStore::new();
        store.insert(DataTag::new(1, "A", 1, 2)).await.unwrap();
        let ev = SupervisionEvent {
            entity_kind: EntityKind::Process,
            entity_id: 1,
            status: SupervisionStatus::Down,
            event_time: Some(10),
            message: "gone".into(),
            revision: 3,
        };
        assert!(store.apply_supervision(1, &ev).await.unwrap());
        let tag = store.get(1).await.unwrap();
        assert_eq!(tag.supervision_event(EntityKey::process(1)), Some(&ev));
        assert!(!tag.is_supervision_valid());
    }
}
