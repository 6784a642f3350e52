use std::collections::BTreeMap;

use crate::cache::Cacheable;
use crate::entity::{EntityKey, SupervisionEvent};
use crate::liveness::TagValue;

/// Cached data tag attached to a process, an equipment and optionally a sub-equipment.
#[derive(Debug, PartialEq)]
pub struct DataTag {
    id: u64,
    name: String,
    process_id: u64,
    equipment_id: u64,
    sub_equipment_id: Option<u64>,

    pub(crate) value: Option<TagValue>,
    pub(crate) value_time: Option<u64>,
    pub(crate) supervision: BTreeMap<EntityKey, SupervisionEvent>,
}

impl DataTag {
    pub fn new(id: u64, name: impl Into<String>, process_id: u64, equipment_id: u64) -> Self {
        Self {
            id,
            name: name.into(),
            process_id,
            equipment_id,
            sub_equipment_id: None,
            value: None,
            value_time: None,
            supervision: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_sub_equipment(mut self, sub_equipment_id: u64) -> Self {
        self.sub_equipment_id = Some(sub_equipment_id);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process_id(&self) -> u64 {
        self.process_id
    }

    pub fn equipment_id(&self) -> u64 {
        self.equipment_id
    }

    pub fn sub_equipment_id(&self) -> Option<u64> {
        self.sub_equipment_id
    }

    pub fn value(&self) -> Option<&TagValue> {
        self.value.as_ref()
    }

    pub fn value_time(&self) -> Option<u64> {
        self.value_time
    }

    /// Keys of every entity supervising this tag: process, equipment, then sub-equipment.
    pub fn supervising_entities(&self) -> Vec<EntityKey> {
        let mut keys = vec![
            EntityKey::process(self.process_id),
            EntityKey::equipment(self.equipment_id),
        ];
        keys.extend(self.sub_equipment_id.map(EntityKey::sub_equipment));
        keys
    }

    /// Latest supervision event recorded for `key`.
    pub fn supervision_event(&self, key: EntityKey) -> Option<&SupervisionEvent> {
        self.supervision.get(&key)
    }

    /// False as soon as one recorded supervising entity is inactive.
    ///
    /// Entities with no recorded event yet do not invalidate the tag.
    pub fn is_supervision_valid(&self) -> bool {
        self.supervision.values().all(|e| e.status.is_active())
    }

    /// Records `event` unless a newer one is already held. Returns `true` if recorded.
    pub(crate) fn record_supervision(&mut self, event: &SupervisionEvent) -> bool {
        let key = event.key();
        if let Some(existing) = self.supervision.get(&key) {
            if event.is_older_than(existing) {
                return false;
            }
        }
        self.supervision.insert(key, event.clone());
        true
    }
}

impl Cacheable for DataTag {
    type Key = u64;

    fn key(&self) -> u64 {
        self.id
    }

    fn deep_copy(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            process_id: self.process_id,
            equipment_id: self.equipment_id,
            sub_equipment_id: self.sub_equipment_id,
            value: self.value.clone(),
            value_time: self.value_time,
            supervision: self.supervision.clone(),
        }
    }
}
