//! # Supervision manager: owns the stores, routes liveness signals, runs the expiry scan.
//!
//! The [`SupervisionManager`] is built once through a
//! [`ManagerBuilder`](crate::ManagerBuilder) and shared by reference (`Arc`).
//!
//! ## Architecture
//! ```text
//! process_control_tag(update)
//!   ├─ alive tag?      ─► on_alive ─► LivenessTracker.observe
//!   │                                   ├─ stale    ─► SignalOutcome::Stale (logged)
//!   │                                   └─ accepted ─► entities.resume(owner, arrival)
//!   ├─ comm-fault tag? ─► on_comm_fault ─► CommFaultInterpreter
//!   │                                   ├─ down ─► entities.suspend(owner)
//!   │                                   └─ up   ─► resume(owner) + refresh alive + restart timer
//!   └─ otherwise       ─► Err(UnknownControlTag)
//!
//! expiry scanner (every expiry_scan_period)
//!   └─► LivenessTracker.expired(now) ─► entities.suspend(owner, now) one by one
//!
//! entities ── SUPERVISION_UPDATE (pooled, per key) ──► TagSupervisionNotifier ──► tags
//! entities / tags ── accepted writes ──► Bus ──► subscribe()
//! ```
//!
//! ## Shutdown
//! ```text
//! run(): wait_for_shutdown_signal() or shutdown token
//!   └─► shutdown():
//!         ├─ cancel token, join scanner
//!         └─ drain entity + tag dispatchers within cfg.grace
//!               ├─ Ok       → Ok(())
//!               └─ timeout  → Err(RuntimeError::GraceExceeded)
//! ```
//!
//! ## Example
//! ```no_run
//! use tagvisor::{ControlTagUpdate, EntityKey, ManagerBuilder, SupervisedEntity, SupervisionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ManagerBuilder::new(SupervisionConfig::default()).build()?;
//!     manager
//!         .configure_entity(SupervisedEntity::process(1, "P_DEMO", 10).with_alive(11, 60_000))
//!         .await?;
//!
//!     manager.start(EntityKey::process(1), tagvisor::now_millis()).await?;
//!     manager
//!         .process_control_tag(ControlTagUpdate::new(11, 1_i64), tagvisor::now_millis())
//!         .await?;
//!
//!     manager.run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::entity::{EntityKey, EntityKind, SupervisedEntity, SupervisionEvent};
use crate::error::{RuntimeError, SupervisionError};
use crate::liveness::{
    AliveSignal, AliveVerdict, CommFaultInterpreter, CommFaultSignal, CommFaultTag,
    ControlTagUpdate, LivenessTracker,
};
use crate::supervision::{CommandOutcome, SupervisionService};
use crate::tags::{DataTag, TagStore};

use super::{config::SupervisionConfig, scanner, shutdown};

/// What became of a liveness signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Delayed beyond tolerance; dropped without touching the entity.
    Stale { delay_millis: u64 },
    /// Turned into a supervision command.
    Applied(CommandOutcome),
}

impl SignalOutcome {
    /// True if the signal produced an accepted supervision write.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SignalOutcome::Applied(o) if o.is_accepted())
    }
}

/// Owner of every supervision component.
pub struct SupervisionManager {
    cfg: SupervisionConfig,
    entities: SupervisionService,
    tags: Arc<TagStore>,
    liveness: LivenessTracker,
    comm_faults: CommFaultInterpreter,
    token: CancellationToken,
    scanner: Mutex<Option<JoinHandle<()>>>,
}

impl SupervisionManager {
    pub(crate) fn new_internal(
        cfg: SupervisionConfig,
        entities: SupervisionService,
        tags: Arc<TagStore>,
    ) -> Self {
        let liveness = LivenessTracker::new(cfg.alive_tolerance_factor);
        Self {
            cfg,
            entities,
            tags,
            liveness,
            comm_faults: CommFaultInterpreter::new(),
            token: CancellationToken::new(),
            scanner: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SupervisionConfig {
        &self.cfg
    }

    /// Supervised-entity store and its dispatcher.
    pub fn entities(&self) -> &SupervisionService {
        &self.entities
    }

    /// Data tag store and its dispatcher.
    pub fn tags(&self) -> &Arc<TagStore> {
        &self.tags
    }

    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// Receiver of every accepted supervision write.
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisionEvent> {
        self.entities.bus().subscribe()
    }

    /// Adds an entity, registering its alive timer if it has one.
    ///
    /// A parent, when given, must already be configured: a process for equipment,
    /// an equipment for sub-equipment. Sub-equipment requires one; processes take none.
    pub async fn configure_entity(&self, entity: SupervisedEntity) -> Result<(), SupervisionError> {
        let key = entity.key();
        self.check_parent(&entity)?;
        let alive = entity
            .alive_tag_id()
            .map(|id| (id, entity.alive_interval_millis()));

        if let Some((id, interval)) = alive {
            self.liveness.register(id, key, interval)?;
        }
        if let Err(e) = self.entities.insert(entity).await {
            if let Some((id, _)) = alive {
                self.liveness.deregister(id);
            }
            return Err(e);
        }
        tracing::info!(entity = %key, alive_tag = ?alive.map(|a| a.0), "entity configured");
        Ok(())
    }

    /// Registers a comm-fault tag for an existing equipment or sub-equipment.
    pub fn configure_comm_fault(&self, tag: CommFaultTag) -> Result<(), SupervisionError> {
        if !self.entities.contains(tag.owner) {
            return Err(SupervisionError::UnknownEntity { key: tag.owner });
        }
        self.comm_faults.register(tag)
    }

    /// Adds a data tag; its process and equipment (and sub-equipment) must exist.
    pub async fn configure_tag(&self, tag: DataTag) -> Result<(), SupervisionError> {
        if let Some(key) = tag
            .supervising_entities()
            .into_iter()
            .find(|k| !self.entities.contains(*k))
        {
            return Err(SupervisionError::UnknownEntity { key });
        }
        self.tags.insert(tag).await
    }

    /// Removes an entity together with its alive timer and comm-fault tag.
    pub async fn deconfigure_entity(&self, key: EntityKey) -> Result<SupervisedEntity, SupervisionError> {
        let removed = self.entities.remove(key).await?;
        if let Some(id) = removed.alive_tag_id() {
            self.liveness.deregister(id);
        }
        if let Some(id) = removed.comm_fault_tag_id() {
            self.comm_faults.deregister(id);
        }
        tracing::info!(entity = %key, "entity deconfigured");
        Ok(removed)
    }

    pub async fn deconfigure_tag(&self, id: u64) -> Result<DataTag, SupervisionError> {
        self.tags.remove(id).await
    }

    /// Starts an entity and its alive timer.
    pub async fn start(&self, key: EntityKey, ts: u64) -> Result<CommandOutcome, SupervisionError> {
        let outcome = self.entities.start(key, ts).await?;
        if outcome.is_accepted() {
            self.liveness.start_timer(key, ts);
        }
        Ok(outcome)
    }

    /// Stops an entity and its alive timer.
    pub async fn stop(&self, key: EntityKey, ts: u64) -> Result<CommandOutcome, SupervisionError> {
        let outcome = self.entities.stop(key, ts).await?;
        if outcome.is_accepted() {
            self.liveness.stop_timer(key);
        }
        Ok(outcome)
    }

    pub async fn suspend(
        &self,
        key: EntityKey,
        ts: u64,
        message: &str,
    ) -> Result<CommandOutcome, SupervisionError> {
        self.entities.suspend(key, ts, message).await
    }

    /// Resumes an entity and (re)starts its alive timer.
    pub async fn resume(
        &self,
        key: EntityKey,
        ts: u64,
        message: &str,
    ) -> Result<CommandOutcome, SupervisionError> {
        let outcome = self.entities.resume(key, ts, message).await?;
        if outcome.is_accepted() {
            self.liveness.start_timer(key, ts);
        }
        Ok(outcome)
    }

    /// Stops a process and every equipment and sub-equipment below it.
    ///
    /// Each entity is stopped under its own lock; the returned outcomes follow the
    /// walk order (process, then each equipment followed by its sub-equipment).
    pub async fn disconnect_process(
        &self,
        process_id: u64,
        ts: u64,
    ) -> Result<Vec<(EntityKey, CommandOutcome)>, SupervisionError> {
        let root = EntityKey::process(process_id);
        let mut outcomes = vec![(root, self.stop(root, ts).await?)];

        for equipment in self.entities.children_of(root) {
            match self.stop(equipment, ts).await {
                Ok(o) => outcomes.push((equipment, o)),
                Err(SupervisionError::UnknownEntity { .. }) => continue,
                Err(e) => return Err(e),
            }
            for sub in self.entities.children_of(equipment) {
                match self.stop(sub, ts).await {
                    Ok(o) => outcomes.push((sub, o)),
                    Err(SupervisionError::UnknownEntity { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        tracing::info!(process = process_id, entities = outcomes.len(), "process disconnected");
        Ok(outcomes)
    }

    /// Re-pushes every entity under `CONFIRM_STATUS`.
    pub async fn confirm_status(&self) -> usize {
        self.entities.confirm_all().await
    }

    /// Routes a control tag update to the alive or comm-fault path.
    ///
    /// The signal timestamp is the earliest of the update's source and DAQ
    /// timestamps, or `arrival_ts` if it carries neither.
    pub async fn process_control_tag(
        &self,
        update: ControlTagUpdate,
        arrival_ts: u64,
    ) -> Result<SignalOutcome, SupervisionError> {
        tracing::trace!(tag = update.tag_id, value = %update.value, "control tag update");
        if self.liveness.is_registered(update.tag_id) {
            self.on_alive(update.into_alive(arrival_ts)).await
        } else if self.comm_faults.is_registered(update.tag_id) {
            self.on_comm_fault(update.into_comm_fault(arrival_ts)).await
        } else {
            tracing::warn!(tag = update.tag_id, "update for unknown control tag");
            Err(SupervisionError::UnknownControlTag { id: update.tag_id })
        }
    }

    /// Handles an alive signal: drops it when stale, otherwise resumes the owner.
    pub async fn on_alive(&self, signal: AliveSignal) -> Result<SignalOutcome, SupervisionError> {
        let (owner, verdict) = self
            .liveness
            .observe(signal.alive_tag_id, signal.signal_ts, signal.arrival_ts)
            .ok_or(SupervisionError::UnknownControlTag {
                id: signal.alive_tag_id,
            })?;

        match verdict {
            AliveVerdict::Stale { delay_millis } => {
                tracing::debug!(
                    entity = %owner,
                    alive_tag = signal.alive_tag_id,
                    delay_millis,
                    "delayed alive rejected"
                );
                Ok(SignalOutcome::Stale { delay_millis })
            }
            AliveVerdict::Accepted => {
                let message = format!("{} Alive tag received.", owner.kind.display_name());
                let outcome = self
                    .entities
                    .resume(owner, signal.arrival_ts, &message)
                    .await?;
                Ok(SignalOutcome::Applied(outcome))
            }
        }
    }

    /// Handles a comm-fault signal: suspends the owner on the fault value, resumes it otherwise.
    pub async fn on_comm_fault(&self, signal: CommFaultSignal) -> Result<SignalOutcome, SupervisionError> {
        let tag = self
            .comm_faults
            .get(signal.comm_fault_tag_id)
            .ok_or(SupervisionError::UnknownControlTag {
                id: signal.comm_fault_tag_id,
            })?;
        let owner = self.entities.get(tag.owner).await?;
        let reading = self.comm_faults.interpret(&signal, owner.name())?;

        let outcome = if reading.up {
            if let Some(alive) = reading.alive_tag_id {
                self.liveness.refresh(alive, reading.timestamp);
            }
            self.resume(reading.owner, reading.timestamp, &reading.message).await?
        } else {
            self.entities
                .suspend(reading.owner, reading.timestamp, &reading.message)
                .await?
        };
        Ok(SignalOutcome::Applied(outcome))
    }

    /// Suspends the owner of every alive timer silent for longer than its interval.
    pub async fn scan_expired(&self, now: u64) -> Vec<(EntityKey, CommandOutcome)> {
        let mut out = Vec::new();
        for expiry in self.liveness.expired(now) {
            let message = format!(
                "{} alive timer expired: no alive tag {} received since {}.",
                expiry.owner.kind.display_name(),
                expiry.alive_tag_id,
                expiry.last_seen_millis
            );
            match self.entities.suspend(expiry.owner, now, &message).await {
                Ok(outcome) => {
                    tracing::info!(entity = %expiry.owner, alive_tag = expiry.alive_tag_id, "alive timer expired");
                    out.push((expiry.owner, outcome));
                }
                Err(e) => {
                    tracing::warn!(entity = %expiry.owner, error = %e, "expired timer without entity");
                }
            }
        }
        out
    }

    /// Spawns the expiry scanner if enabled and not yet running. Returns `true` if spawned.
    pub async fn spawn_scanner(self: &Arc<Self>) -> bool {
        let Some(period) = self.cfg.scan_period() else {
            return false;
        };
        let mut slot = self.scanner.lock().await;
        if slot.is_some() || self.token.is_cancelled() {
            return false;
        }
        *slot = Some(scanner::spawn(
            Arc::downgrade(self),
            period,
            self.token.child_token(),
        ));
        true
    }

    /// Runs until an OS termination signal or [`shutdown`](Self::shutdown), then drains.
    pub async fn run(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.spawn_scanner().await;
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                let signal = res?;
                tracing::info!(signal, "shutdown requested");
            }
            _ = self.token.cancelled() => {}
        }
        self.shutdown().await
    }

    /// Stops the scanner and drains every listener within the grace period.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.token.cancel();
        if let Some(h) = self.scanner.lock().await.take() {
            if h.await.is_err() {
                tracing::error!("expiry scanner aborted");
            }
        }

        let grace = self.cfg.grace;
        let drain = async {
            self.entities.dispatcher().shutdown().await;
            self.tags.dispatcher().shutdown().await;
        };
        match tokio::time::timeout(grace, drain).await {
            Ok(()) => {
                tracing::info!("supervision stopped within grace");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(?grace, "listener drain exceeded grace");
                Err(RuntimeError::GraceExceeded { grace })
            }
        }
    }

    fn check_parent(&self, entity: &SupervisedEntity) -> Result<(), SupervisionError> {
        let expected = match entity.kind() {
            EntityKind::Process => None,
            EntityKind::Equipment => Some(EntityKind::Process),
            EntityKind::SubEquipment => Some(EntityKind::Equipment),
        };
        match (expected, entity.parent()) {
            (None, None) => Ok(()),
            (Some(kind), Some(parent)) if parent.kind == kind => {
                if self.entities.contains(parent) {
                    Ok(())
                } else {
                    Err(SupervisionError::UnknownEntity { key: parent })
                }
            }
            (Some(kind), None) if kind == EntityKind::Process => Ok(()),
            _ => Err(SupervisionError::InvalidConfiguration {
                reason: format!("{} cannot have parent {:?}", entity.key(), entity.parent()),
            }),
        }
    }
}
