//! # Supervision service.
//!
//! Owns the supervised-entity store and runs every status write through the
//! same locked sequence:
//!
//! ```text
//! lock(key) ─► plan ─► apply ─► notify_synchronous ─► bus.publish ─► unlock ─► deliver
//!               │
//!               └─ rejected ─► read current event ─► unlock
//! ```
//!
//! ## Rules
//! - One key lock per write; the lock is never held across two entities.
//! - Synchronous listeners and the bus observe writes of one entity in write order.
//! - Rejections change nothing and raise nothing.
//! - Unknown keys are errors, never silently ignored.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::KeyedCache;
use crate::entity::{EntityKey, SupervisedEntity, SupervisionEvent};
use crate::error::SupervisionError;
use crate::events::{Bus, CacheEventKind};
use crate::listeners::CacheDispatcher;

use super::machine::{self, INSERT_EVENTS, Operation, StopSemantics};
use super::outcome::{CommandOutcome, Verdict};

/// Capability-restricted facade over the supervised-entity store.
pub struct SupervisionService {
    store: KeyedCache<SupervisedEntity>,
    children: DashMap<EntityKey, BTreeSet<EntityKey>>,
    dispatcher: Arc<CacheDispatcher<SupervisedEntity>>,
    bus: Bus,
    stop: StopSemantics,
}

impl SupervisionService {
    pub fn new(bus: Bus, stop: StopSemantics) -> Self {
        Self {
            store: KeyedCache::new(),
            children: DashMap::new(),
            dispatcher: Arc::new(CacheDispatcher::new("supervision")),
            bus,
            stop,
        }
    }

    /// Bus receiving every accepted status write.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Listener registry of the entity store.
    pub fn dispatcher(&self) -> &Arc<CacheDispatcher<SupervisedEntity>> {
        &self.dispatcher
    }

    /// Adds a configured entity and announces it.
    ///
    /// Raises `UPDATE_ACCEPTED`, `SUPERVISION_UPDATE` and `SUPERVISION_CHANGE`.
    pub async fn insert(&self, entity: SupervisedEntity) -> Result<(), SupervisionError> {
        let parent = entity.parent();
        let guard = self.store.insert_locked(entity).await.map_err(|key| {
            SupervisionError::AlreadyConfigured {
                what: "entity",
                id: key.to_string(),
            }
        })?;
        let key = guard.key();
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().insert(key);
        }

        let pending = self.dispatcher.notify_synchronous(INSERT_EVENTS, &guard).await;
        self.bus.publish(guard.supervision_event());
        drop(guard);
        self.dispatcher.deliver(pending).await;

        tracing::debug!(entity = %key, "supervised entity configured");
        Ok(())
    }

    /// Removes an entity, returning its last state.
    pub async fn remove(&self, key: EntityKey) -> Result<SupervisedEntity, SupervisionError> {
        let removed = self
            .store
            .remove(&key)
            .await
            .ok_or(SupervisionError::UnknownEntity { key })?;
        if let Some(parent) = removed.parent() {
            if let Some(mut siblings) = self.children.get_mut(&parent) {
                siblings.remove(&key);
            }
            self.children.remove_if(&parent, |_, siblings| siblings.is_empty());
        }
        self.children.remove(&key);
        tracing::debug!(entity = %key, "supervised entity removed");
        Ok(removed)
    }

    pub async fn start(&self, key: EntityKey, ts: u64) -> Result<CommandOutcome, SupervisionError> {
        self.transition(key, Operation::Start, ts, "").await
    }

    pub async fn stop(&self, key: EntityKey, ts: u64) -> Result<CommandOutcome, SupervisionError> {
        self.transition(key, Operation::Stop, ts, "").await
    }

    pub async fn suspend(
        &self,
        key: EntityKey,
        ts: u64,
        message: &str,
    ) -> Result<CommandOutcome, SupervisionError> {
        self.transition(key, Operation::Suspend, ts, message).await
    }

    pub async fn resume(
        &self,
        key: EntityKey,
        ts: u64,
        message: &str,
    ) -> Result<CommandOutcome, SupervisionError> {
        self.transition(key, Operation::Resume, ts, message).await
    }

    /// Current status of an entity as an event value.
    pub async fn event(&self, key: EntityKey) -> Result<SupervisionEvent, SupervisionError> {
        Ok(self.lock(key).await?.supervision_event())
    }

    /// Deep copy of an entity.
    pub async fn get(&self, key: EntityKey) -> Result<SupervisedEntity, SupervisionError> {
        self.store
            .get_copy(&key)
            .await
            .ok_or(SupervisionError::UnknownEntity { key })
    }

    pub async fn is_running(&self, key: EntityKey) -> Result<bool, SupervisionError> {
        Ok(self.lock(key).await?.supervision_status().is_running())
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.store.contains(&key)
    }

    /// Every configured key, sorted.
    pub fn keys(&self) -> Vec<EntityKey> {
        self.store.keys()
    }

    /// Direct children (equipment of a process, sub-equipment of an equipment).
    pub fn children_of(&self, key: EntityKey) -> Vec<EntityKey> {
        self.children
            .get(&key)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Switches an entity between local and server configuration.
    ///
    /// Raises `UPDATE_ACCEPTED`; the status is untouched.
    pub async fn set_local_config(&self, key: EntityKey, local: bool) -> Result<(), SupervisionError> {
        let mut guard = self.lock(key).await?;
        guard.set_local_config(local);
        let pending = self
            .dispatcher
            .notify_synchronous(CacheEventKind::UpdateAccepted.into(), &guard)
            .await;
        drop(guard);
        self.dispatcher.deliver(pending).await;
        Ok(())
    }

    /// Re-pushes every entity under `CONFIRM_STATUS`. Returns the number pushed.
    pub async fn confirm_all(&self) -> usize {
        let mut pushed = 0;
        for key in self.store.keys() {
            let Some(guard) = self.store.lock(&key).await else {
                continue;
            };
            let pending = self
                .dispatcher
                .notify_synchronous(CacheEventKind::ConfirmStatus.into(), &guard)
                .await;
            drop(guard);
            self.dispatcher.deliver(pending).await;
            pushed += 1;
        }
        tracing::info!(entities = pushed, "supervision status confirmed");
        pushed
    }

    async fn lock(
        &self,
        key: EntityKey,
    ) -> Result<tokio::sync::OwnedMutexGuard<SupervisedEntity>, SupervisionError> {
        self.store
            .lock(&key)
            .await
            .ok_or(SupervisionError::UnknownEntity { key })
    }

    async fn transition(
        &self,
        key: EntityKey,
        op: Operation,
        ts: u64,
        message: &str,
    ) -> Result<CommandOutcome, SupervisionError> {
        let mut guard = self.lock(key).await?;

        let t = match machine::plan(&guard, op, ts, message, self.stop) {
            Ok(t) => t,
            Err(rejection) => {
                tracing::debug!(entity = %key, %op, ts, reason = %rejection, "supervision request rejected");
                return Ok(CommandOutcome {
                    verdict: Verdict::Rejected(rejection),
                    event: guard.supervision_event(),
                });
            }
        };

        machine::apply(&mut guard, &t);
        let event = guard.supervision_event();
        let pending = self.dispatcher.notify_synchronous(t.events, &guard).await;
        self.bus.publish(event.clone());
        drop(guard);
        self.dispatcher.deliver(pending).await;

        if t.from.is_active() != t.to.is_active() {
            tracing::info!(entity = %key, %op, from = %t.from, to = %t.to, ts = t.status_time, "supervision changed");
        } else {
            tracing::debug!(entity = %key, %op, from = %t.from, to = %t.to, ts = t.status_time, "supervision updated");
        }

        Ok(CommandOutcome {
            verdict: Verdict::Accepted(t.events),
            event,
        })
    }
}
