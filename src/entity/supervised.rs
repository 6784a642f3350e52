//! # Supervised entity record.
//!
//! One [`SupervisedEntity`] exists per configured process, equipment and
//! sub-equipment. Configuration fields are set through the `with_*` builders
//! before insertion; supervision fields are written only by the state machine.

use crate::cache::Cacheable;

use super::{EntityKey, EntityKind, SupervisionEvent, SupervisionStatus};

/// Cached record of a supervised entity.
#[derive(Debug, PartialEq, Eq)]
pub struct SupervisedEntity {
    key: EntityKey,
    name: String,
    state_tag_id: u64,
    alive_tag_id: Option<u64>,
    alive_interval_millis: u64,
    comm_fault_tag_id: Option<u64>,
    parent: Option<EntityKey>,
    local_config: bool,

    pub(crate) supervision_status: SupervisionStatus,
    pub(crate) status_description: String,
    pub(crate) status_time: Option<u64>,
    pub(crate) revision: u64,
}

impl SupervisedEntity {
    /// Creates an entity in its initial `DOWN` state with no status time.
    pub fn new(key: EntityKey, name: impl Into<String>, state_tag_id: u64) -> Self {
        Self {
            key,
            name: name.into(),
            state_tag_id,
            alive_tag_id: None,
            alive_interval_millis: 0,
            comm_fault_tag_id: None,
            parent: None,
            local_config: false,
            supervision_status: SupervisionStatus::Down,
            status_description: String::new(),
            status_time: None,
            revision: 0,
        }
    }

    pub fn process(id: u64, name: impl Into<String>, state_tag_id: u64) -> Self {
        Self::new(EntityKey::process(id), name, state_tag_id)
    }

    pub fn equipment(id: u64, name: impl Into<String>, state_tag_id: u64) -> Self {
        Self::new(EntityKey::equipment(id), name, state_tag_id)
    }

    pub fn sub_equipment(id: u64, name: impl Into<String>, state_tag_id: u64) -> Self {
        Self::new(EntityKey::sub_equipment(id), name, state_tag_id)
    }

    /// Attaches an alive tag with its expected signal period.
    #[must_use]
    pub fn with_alive(mut self, alive_tag_id: u64, interval_millis: u64) -> Self {
        self.alive_tag_id = Some(alive_tag_id);
        self.alive_interval_millis = interval_millis;
        self
    }

    /// Attaches a communication-fault tag.
    #[must_use]
    pub fn with_comm_fault(mut self, comm_fault_tag_id: u64) -> Self {
        self.comm_fault_tag_id = Some(comm_fault_tag_id);
        self
    }

    /// Sets the owning entity (process of an equipment, equipment of a sub-equipment).
    #[must_use]
    pub fn with_parent(mut self, parent: EntityKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Marks a process as running on a local configuration (`RUNNING_LOCAL`).
    #[must_use]
    pub fn with_local_config(mut self, local: bool) -> Self {
        self.local_config = local;
        self
    }

    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub fn id(&self) -> u64 {
        self.key.id
    }

    pub fn kind(&self) -> EntityKind {
        self.key.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_tag_id(&self) -> u64 {
        self.state_tag_id
    }

    pub fn alive_tag_id(&self) -> Option<u64> {
        self.alive_tag_id
    }

    pub fn alive_interval_millis(&self) -> u64 {
        self.alive_interval_millis
    }

    pub fn comm_fault_tag_id(&self) -> Option<u64> {
        self.comm_fault_tag_id
    }

    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    pub fn local_config(&self) -> bool {
        self.local_config
    }

    pub fn supervision_status(&self) -> SupervisionStatus {
        self.supervision_status
    }

    pub fn status_description(&self) -> &str {
        &self.status_description
    }

    pub fn status_time(&self) -> Option<u64> {
        self.status_time
    }

    /// Number of accepted status writes since insertion.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_local_config(&mut self, local: bool) {
        self.local_config = local;
    }

    /// Current status as an immutable event value.
    pub fn supervision_event(&self) -> SupervisionEvent {
        SupervisionEvent {
            entity_kind: self.key.kind,
            entity_id: self.key.id,
            status: self.supervision_status,
            event_time: self.status_time,
            message: self.status_description.clone(),
            revision: self.revision,
        }
    }
}

impl Cacheable for SupervisedEntity {
    type Key = EntityKey;

    fn key(&self) -> EntityKey {
        self.key
    }

    /// Field-by-field copy. Every field is a value type or an owned string, so the
    /// copy shares nothing with the cached record.
    fn deep_copy(&self) -> Self {
        Self {
            key: self.key,
            name: self.name.clone(),
            state_tag_id: self.state_tag_id,
            alive_tag_id: self.alive_tag_id,
            alive_interval_millis: self.alive_interval_millis,
            comm_fault_tag_id: self.comm_fault_tag_id,
            parent: self.parent,
            local_config: self.local_config,
            supervision_status: self.supervision_status,
            status_description: self.status_description.clone(),
            status_time: self.status_time,
            revision: self.revision,
        }
    }
}
