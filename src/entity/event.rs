use super::{EntityKey, EntityKind, SupervisionStatus};

/// Immutable observation of an entity's supervision status.
///
/// Produced on every status read and every accepted status write. Two reads of an
/// entity with no intervening mutation produce equal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisionEvent {
    pub entity_kind: EntityKind,
    pub entity_id: u64,
    pub status: SupervisionStatus,
    /// Time of the last status change (ms since epoch); `None` until first written.
    pub event_time: Option<u64>,
    pub message: String,
    /// Accepted writes to the entity before this observation; breaks ties
    /// between writes sharing a timestamp.
    pub revision: u64,
}

impl SupervisionEvent {
    /// Key of the entity this event describes.
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_kind, self.entity_id)
    }

    /// True if `self` describes a strictly older observation than `other`.
    ///
    /// Time decides first; at equal times the lower revision is older.
    pub fn is_older_than(&self, other: &SupervisionEvent) -> bool {
        (self.event_time, self.revision) < (other.event_time, other.revision)
    }
}
