//! # Supervision status.
//!
//! ```text
//!   active:   STARTUP  RUNNING  RUNNING_LOCAL
//!   inactive: DOWN     STOPPED  UNCERTAIN
//! ```
//!
//! `SUPERVISION_CHANGE` is raised only when a write crosses this boundary.

use std::fmt;

/// Supervision state of an entity. A newly configured entity is [`Down`](Self::Down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupervisionStatus {
    #[default]
    Down,
    Stopped,
    Startup,
    Running,
    RunningLocal,
    Uncertain,
}

impl SupervisionStatus {
    /// Every status, in declaration order.
    pub const ALL: [SupervisionStatus; 6] = [
        SupervisionStatus::Down,
        SupervisionStatus::Stopped,
        SupervisionStatus::Startup,
        SupervisionStatus::Running,
        SupervisionStatus::RunningLocal,
        SupervisionStatus::Uncertain,
    ];

    /// Coarse classification: `STARTUP`, `RUNNING` and `RUNNING_LOCAL` are active.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SupervisionStatus::Startup | SupervisionStatus::Running | SupervisionStatus::RunningLocal
        )
    }

    /// `RUNNING` or `RUNNING_LOCAL`.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, SupervisionStatus::Running | SupervisionStatus::RunningLocal)
    }

    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisionStatus::Down => "DOWN",
            SupervisionStatus::Stopped => "STOPPED",
            SupervisionStatus::Startup => "STARTUP",
            SupervisionStatus::Running => "RUNNING",
            SupervisionStatus::RunningLocal => "RUNNING_LOCAL",
            SupervisionStatus::Uncertain => "UNCERTAIN",
        }
    }
}

impl fmt::Display for SupervisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
