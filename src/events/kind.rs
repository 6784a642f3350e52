//! # Cache event classification.
//!
//! | Kind                 | Raised when                                                    |
//! |----------------------|----------------------------------------------------------------|
//! | `UpdateAccepted`     | an object is inserted or a non-supervision update is accepted  |
//! | `SupervisionUpdate`  | every accepted supervision status write                        |
//! | `SupervisionChange`  | the write crosses the active/inactive boundary                 |
//! | `ConfirmStatus`      | restart resynchronization (idempotent re-statement)            |

use std::fmt;

/// Kind of cache notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheEventKind {
    UpdateAccepted,
    SupervisionUpdate,
    SupervisionChange,
    ConfirmStatus,
}

impl CacheEventKind {
    /// Every kind, in delivery order.
    pub const ALL: [CacheEventKind; 4] = [
        CacheEventKind::UpdateAccepted,
        CacheEventKind::SupervisionUpdate,
        CacheEventKind::SupervisionChange,
        CacheEventKind::ConfirmStatus,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            CacheEventKind::UpdateAccepted => "update_accepted",
            CacheEventKind::SupervisionUpdate => "supervision_update",
            CacheEventKind::SupervisionChange => "supervision_change",
            CacheEventKind::ConfirmStatus => "confirm_status",
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Small set of [`CacheEventKind`]s.
///
/// Iteration always follows [`CacheEventKind::ALL`] order, so a listener registered
/// for several kinds receives them in a stable order for one write.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventSet(u8);

impl EventSet {
    pub const EMPTY: EventSet = EventSet(0);

    /// Every kind.
    pub const fn all() -> Self {
        EventSet(0b1111)
    }

    pub fn of(kinds: &[CacheEventKind]) -> Self {
        kinds.iter().fold(EventSet::EMPTY, |set, k| set.with(*k))
    }

    #[must_use]
    pub const fn with(self, kind: CacheEventKind) -> Self {
        EventSet(self.0 | kind.bit())
    }

    pub fn insert(&mut self, kind: CacheEventKind) {
        self.0 |= kind.bit();
    }

    #[inline]
    pub const fn contains(&self, kind: CacheEventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersects(&self, other: EventSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = CacheEventKind> + use<> {
        let set = *self;
        CacheEventKind::ALL.into_iter().filter(move |k| set.contains(*k))
    }
}

impl From<CacheEventKind> for EventSet {
    fn from(kind: CacheEventKind) -> Self {
        EventSet::EMPTY.with(kind)
    }
}

impl fmt::Debug for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
