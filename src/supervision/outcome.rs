use crate::entity::SupervisionEvent;
use crate::events::EventSet;

use super::machine::Rejection;

/// Whether a request was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Applied; carries the events that were raised.
    Accepted(EventSet),
    /// Left the entity untouched.
    Rejected(Rejection),
}

/// Result of a supervision command: the verdict plus the authoritative state
/// of the entity after the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub verdict: Verdict,
    pub event: SupervisionEvent,
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted(_))
    }

    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<Rejection> {
        match self.verdict {
            Verdict::Rejected(r) => Some(r),
            Verdict::Accepted(_) => None,
        }
    }

    /// Events raised by the command (empty when rejected).
    pub fn events(&self) -> EventSet {
        match self.verdict {
            Verdict::Accepted(events) => events,
            Verdict::Rejected(_) => EventSet::EMPTY,
        }
    }
}
