use std::fmt;

/// Kind of supervised entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// Data acquisition process.
    Process,
    /// Equipment unit attached to a process.
    Equipment,
    /// Sub-equipment unit attached to an equipment.
    SubEquipment,
}

impl EntityKind {
    /// Lower-case label used in keys, logs and messages.
    pub fn as_label(&self) -> &'static str {
        match self {
            EntityKind::Process => "process",
            EntityKind::Equipment => "equipment",
            EntityKind::SubEquipment => "subequipment",
        }
    }

    /// Human-readable name used in status descriptions.
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Process => "Process",
            EntityKind::Equipment => "Equipment",
            EntityKind::SubEquipment => "Subequipment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Cache key of a supervised entity.
///
/// Ids are unique per kind, so the kind is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    /// Entity kind.
    pub kind: EntityKind,
    /// Id, unique within `kind`.
    pub id: u64,
}

impl EntityKey {
    pub const fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub const fn process(id: u64) -> Self {
        Self::new(EntityKind::Process, id)
    }

    pub const fn equipment(id: u64) -> Self {
        Self::new(EntityKind::Equipment, id)
    }

    pub const fn sub_equipment(id: u64) -> Self {
        Self::new(EntityKind::SubEquipment, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}
