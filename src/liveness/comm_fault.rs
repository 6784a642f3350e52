//! # Communication-fault interpretation.
//!
//! A comm-fault tag reports whether the link to an equipment or sub-equipment is
//! healthy. The value equal to the configured fault value means "down"; any other
//! value means "up".

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::entity::{EntityKey, EntityKind};
use crate::error::SupervisionError;

use super::signals::{CommFaultSignal, TagValue};

/// Configuration of one communication-fault tag.
#[derive(Debug, Clone, PartialEq)]
pub struct CommFaultTag {
    pub id: u64,
    /// Supervised equipment or sub-equipment.
    pub owner: EntityKey,
    pub fault_value: TagValue,
    /// Alive tag refreshed whenever the link reports "up".
    pub alive_tag_id: Option<u64>,
}

impl CommFaultTag {
    pub fn new(id: u64, owner: EntityKey, fault_value: impl Into<TagValue>) -> Self {
        Self {
            id,
            owner,
            fault_value: fault_value.into(),
            alive_tag_id: None,
        }
    }

    #[must_use]
    pub fn with_alive_tag(mut self, alive_tag_id: u64) -> Self {
        self.alive_tag_id = Some(alive_tag_id);
        self
    }
}

/// What a comm-fault signal means for its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub owner: EntityKey,
    /// `true` → resume, `false` → suspend.
    pub up: bool,
    pub message: String,
    pub timestamp: u64,
    pub alive_tag_id: Option<u64>,
}

/// Registry of comm-fault tags.
#[derive(Default)]
pub struct CommFaultInterpreter {
    tags: DashMap<u64, CommFaultTag>,
}

impl CommFaultInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a comm-fault tag. Processes cannot own one.
    pub fn register(&self, tag: CommFaultTag) -> Result<(), SupervisionError> {
        if tag.owner.kind == EntityKind::Process {
            return Err(SupervisionError::InvalidConfiguration {
                reason: format!("comm-fault tag {} cannot supervise {}", tag.id, tag.owner),
            });
        }
        match self.tags.entry(tag.id) {
            Entry::Occupied(_) => Err(SupervisionError::AlreadyConfigured {
                what: "comm-fault tag",
                id: tag.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(tag);
                Ok(())
            }
        }
    }

    pub fn deregister(&self, id: u64) -> Option<CommFaultTag> {
        self.tags.remove(&id).map(|(_, t)| t)
    }

    pub fn is_registered(&self, id: u64) -> bool {
        self.tags.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<CommFaultTag> {
        self.tags.get(&id).map(|t| t.clone())
    }

    /// Classifies a signal; `owner_name` is used in the status message.
    pub fn interpret(
        &self,
        signal: &CommFaultSignal,
        owner_name: &str,
    ) -> Result<Interpretation, SupervisionError> {
        let tag = self
            .tags
            .get(&signal.comm_fault_tag_id)
            .ok_or(SupervisionError::UnknownControlTag {
                id: signal.comm_fault_tag_id,
            })?;

        let up = signal.value != tag.fault_value;
        let kind = tag.owner.kind.display_name();
        let mut message = format!(
            "Communication fault tag indicates that {kind} {owner_name} is {}.",
            if up { "up" } else { "down" }
        );
        if !up && !signal.value_description.is_empty() {
            message.push_str(" Reason: ");
            message.push_str(&signal.value_description);
        }

        Ok(Interpretation {
            owner: tag.owner,
            up,
            message,
            timestamp: signal.signal_ts,
            alive_tag_id: tag.alive_tag_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(value: bool) -> CommFaultSignal {
        CommFaultSignal {
            comm_fault_tag_id: 7,
            value: TagValue::Bool(value),
            value_description: "link lost".into(),
            signal_ts: 5000,
        }
    }

    #[test]
    fn fault_value_means_down() {
        let i = CommFaultInterpreter::new();
        i.register(CommFaultTag::new(7, EntityKey::equipment(2), false).with_alive_tag(70))
            .unwrap();

        let down = i.interpret(&signal(false), "E_PLC").unwrap();
        assert!(!down.up);
        assert_eq!(down.owner, EntityKey::equipment(2));
        assert_eq!(
            down.message,
            "Communication fault tag indicates that Equipment E_PLC is down. Reason: link lost"
        );

        let up = i.interpret(&signal(true), "E_PLC").unwrap();
        assert!(up.up);
        assert_eq!(up.alive_tag_id, Some(70));
        assert_eq!(up.timestamp, 5000);
    }

    #[test]
    fn process_owner_is_rejected() {
        let i = CommFaultInterpreter::new();
        let err = i.register(CommFaultTag::new(1, EntityKey::process(1), false)).unwrap_err();
        assert_eq!(err.as_label(), "invalid_configuration");
    }

    #[test]
    fn unregistered_tag_is_unknown() {
        let err = CommFaultInterpreter::new().interpret(&signal(true), "x").unwrap_err();
        assert_eq!(err, SupervisionError::UnknownControlTag { id: 7 });
    }
}
