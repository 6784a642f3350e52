//! # Supervision state machine.
//!
//! Pure transition logic: [`plan`] decides, [`apply`] writes. Neither locks nor
//! notifies; the service runs both inside the entity's key lock.
//!
//! ```text
//!              start                 resume
//!   inactive ─────────► STARTUP ─────────────► RUNNING / RUNNING_LOCAL
//!      ▲                   │                          │
//!      │   suspend (DOWN)  │      suspend (DOWN)      │
//!      └───────────────────┴──────────────────────────┘
//!      ▲                                              │
//!      └──────────── stop (DOWN or STOPPED) ──────────┘
//! ```
//!
//! | from \ op       | start    | stop       | suspend  | resume         |
//! |-----------------|----------|------------|----------|----------------|
//! | `DOWN`          | STARTUP  | rejected   | rejected | RUNNING*       |
//! | `STOPPED`       | STARTUP  | rejected   | rejected | RUNNING*       |
//! | `UNCERTAIN`     | STARTUP  | rejected   | DOWN     | RUNNING*       |
//! | `STARTUP`       | rejected | stop state | DOWN     | RUNNING*       |
//! | `RUNNING`       | rejected | stop state | DOWN     | rejected       |
//! | `RUNNING_LOCAL` | rejected | stop state | DOWN     | rejected       |
//!
//! `RUNNING*` is `RUNNING_LOCAL` for entities on a local configuration.
//!
//! A request whose timestamp is older than the recorded `status_time` is rejected
//! before the table is consulted.

use std::fmt;

use crate::entity::{SupervisedEntity, SupervisionStatus};
use crate::events::{CacheEventKind, EventSet};

/// Administrative or signal-driven supervision request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    Stop,
    Suspend,
    Resume,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Start,
        Operation::Stop,
        Operation::Suspend,
        Operation::Resume,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Suspend => "suspend",
            Operation::Resume => "resume",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Status an entity lands in when stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopSemantics {
    Down,
    #[default]
    Stopped,
}

impl StopSemantics {
    pub fn status(&self) -> SupervisionStatus {
        match self {
            StopSemantics::Down => SupervisionStatus::Down,
            StopSemantics::Stopped => SupervisionStatus::Stopped,
        }
    }
}

/// Why a request left the entity untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The operation is not defined from the current status.
    InvalidTransition {
        from: SupervisionStatus,
        op: Operation,
    },
    /// The request is older than the recorded status time.
    Stale { recorded: u64, supplied: u64 },
}

impl Rejection {
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::InvalidTransition { .. } => "invalid_transition",
            Rejection::Stale { .. } => "stale",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InvalidTransition { from, op } => write!(f, "{op} is not allowed from {from}"),
            Rejection::Stale { recorded, supplied } => {
                write!(f, "timestamp {supplied} is older than recorded {recorded}")
            }
        }
    }
}

/// An accepted write, computed but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SupervisionStatus,
    pub to: SupervisionStatus,
    pub status_time: u64,
    pub message: String,
    pub events: EventSet,
}

/// Events raised when an entity is first inserted.
pub const INSERT_EVENTS: EventSet = EventSet::EMPTY
    .with(CacheEventKind::UpdateAccepted)
    .with(CacheEventKind::SupervisionUpdate)
    .with(CacheEventKind::SupervisionChange);

/// `SUPERVISION_UPDATE`, plus `SUPERVISION_CHANGE` when the write crosses the
/// active/inactive boundary.
pub fn events_for(from: SupervisionStatus, to: SupervisionStatus) -> EventSet {
    let events = EventSet::from(CacheEventKind::SupervisionUpdate);
    if from.is_active() != to.is_active() {
        events.with(CacheEventKind::SupervisionChange)
    } else {
        events
    }
}

/// Decides the outcome of `op` at `ts` on `entity`.
pub fn plan(
    entity: &SupervisedEntity,
    op: Operation,
    ts: u64,
    message: &str,
    stop: StopSemantics,
) -> Result<Transition, Rejection> {
    let from = entity.supervision_status();
    let recorded = entity.status_time();

    if let Some(recorded) = recorded {
        if ts < recorded {
            return Err(Rejection::Stale {
                recorded,
                supplied: ts,
            });
        }
    }

    let running = if entity.local_config() {
        SupervisionStatus::RunningLocal
    } else {
        SupervisionStatus::Running
    };
    let invalid = Err(Rejection::InvalidTransition { from, op });

    let (to, status_time, message) = match op {
        Operation::Start => {
            if from.is_active() {
                return invalid;
            }
            (SupervisionStatus::Startup, ts, format!("{} was started", entity.name()))
        }
        Operation::Stop => {
            if !from.is_active() {
                return invalid;
            }
            (stop.status(), ts, String::new())
        }
        Operation::Suspend => match from {
            SupervisionStatus::Startup
            | SupervisionStatus::Running
            | SupervisionStatus::RunningLocal
            | SupervisionStatus::Uncertain => (SupervisionStatus::Down, ts, message.to_owned()),
            SupervisionStatus::Down | SupervisionStatus::Stopped => return invalid,
        },
        Operation::Resume => match from {
            SupervisionStatus::Running | SupervisionStatus::RunningLocal => return invalid,
            SupervisionStatus::Startup => match recorded {
                Some(t) if ts <= t => (running, t, entity.status_description().to_owned()),
                _ => (running, ts, message.to_owned()),
            },
            SupervisionStatus::Down | SupervisionStatus::Stopped | SupervisionStatus::Uncertain => {
                (running, ts, message.to_owned())
            }
        },
    };

    Ok(Transition {
        from,
        to,
        status_time: recorded.map_or(status_time, |r| r.max(status_time)),
        message,
        events: events_for(from, to),
    })
}

/// Writes an accepted transition into the entity.
pub fn apply(entity: &mut SupervisedEntity, transition: &Transition) {
    entity.supervision_status = transition.to;
    entity.status_time = Some(transition.status_time);
    entity.status_description.clone_from(&transition.message);
    entity.revision += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use SupervisionStatus::*;

    fn entity(status: SupervisionStatus, time: Option<u64>) -> SupervisedEntity {
        let mut e = SupervisedEntity::process(1, "P_TEST", 100);
        e.supervision_status = status;
        e.status_time = time;
        e.status_description = "previous".into();
        e
    }

    fn expected(from: SupervisionStatus, op: Operation) -> Option<SupervisionStatus> {
        match (from, op) {
            (Down | Stopped | Uncertain, Operation::Start) => Some(Startup),
            (Startup | Running | RunningLocal, Operation::Stop) => Some(Stopped),
            (Startup | Running | RunningLocal | Uncertain, Operation::Suspend) => Some(Down),
            (Down | Stopped | Uncertain | Startup, Operation::Resume) => Some(Running),
            _ => None,
        }
    }

    #[test]
    fn every_status_and_operation_is_covered() {
        for from in SupervisionStatus::ALL {
            for op in Operation::ALL {
                let e = entity(from, Some(10));
                let got = plan(&e, op, 20, "msg", StopSemantics::Stopped);
                match expected(from, op) {
                    Some(to) => {
                        let t = got.unwrap_or_else(|r| panic!("{from} {op}: {r}"));
                        assert_eq!(t.to, to, "{from} {op}");
                        assert_eq!(t.status_time, 20);
                        assert!(t.events.contains(CacheEventKind::SupervisionUpdate));
                        assert_eq!(
                            t.events.contains(CacheEventKind::SupervisionChange),
                            from.is_active() != to.is_active(),
                            "{from} {op}"
                        );
                        assert!(!t.events.contains(CacheEventKind::UpdateAccepted));
                    }
                    None => assert_eq!(got, Err(Rejection::InvalidTransition { from, op })),
                }
            }
        }
    }

    #[test]
    fn stale_requests_are_rejected_before_anything_else() {
        for from in SupervisionStatus::ALL {
            for op in Operation::ALL {
                let e = entity(from, Some(1000));
                assert_eq!(
                    plan(&e, op, 999, "late", StopSemantics::Down),
                    Err(Rejection::Stale {
                        recorded: 1000,
                        supplied: 999
                    })
                );
            }
        }
    }

    #[test]
    fn missing_status_time_is_never_stale() {
        let e = entity(Down, None);
        let t = plan(&e, Operation::Start, 0, "", StopSemantics::Stopped).unwrap();
        assert_eq!(t.to, Startup);
        assert_eq!(t.status_time, 0);
        assert_eq!(t.message, "P_TEST was started");
    }

    #[test]
    fn start_then_resume_then_resume_again() {
        let mut e = entity(Down, None);

        let t = plan(&e, Operation::Start, 1000, "", StopSemantics::Stopped).unwrap();
        assert_eq!(
            t.events,
            EventSet::of(&[CacheEventKind::SupervisionUpdate, CacheEventKind::SupervisionChange])
        );
        apply(&mut e, &t);
        assert_eq!(e.supervision_status(), Startup);

        let t = plan(&e, Operation::Resume, 1001, "alive", StopSemantics::Stopped).unwrap();
        assert_eq!(t.events, EventSet::from(CacheEventKind::SupervisionUpdate));
        apply(&mut e, &t);
        assert_eq!(e.supervision_status(), Running);
        assert_eq!(e.status_time(), Some(1001));
        assert_eq!(e.status_description(), "alive");
        assert_eq!(e.revision(), 2);

        let r = plan(&e, Operation::Resume, 1002, "alive", StopSemantics::Stopped);
        assert_eq!(
            r,
            Err(Rejection::InvalidTransition {
                from: Running,
                op: Operation::Resume
            })
        );
        assert_eq!(e.status_time(), Some(1001));
    }

    #[test]
    fn resume_from_startup_at_same_time_keeps_message_and_time() {
        let e = entity(Startup, Some(500));
        let t = plan(&e, Operation::Resume, 500, "alive", StopSemantics::Stopped).unwrap();
        assert_eq!(t.to, Running);
        assert_eq!(t.status_time, 500);
        assert_eq!(t.message, "previous");
    }

    #[test]
    fn local_configuration_resumes_to_running_local() {
        let e = entity(Down, Some(1)).with_local_config(true);
        let t = plan(&e, Operation::Resume, 2, "up", StopSemantics::Stopped).unwrap();
        assert_eq!(t.to, RunningLocal);
    }

    #[test]
    fn stop_semantics_pick_the_target_and_clear_the_message() {
        let e = entity(Running, Some(1));
        let down = plan(&e, Operation::Stop, 5, "ignored", StopSemantics::Down).unwrap();
        assert_eq!(down.to, Down);
        assert_eq!(down.message, "");
        let stopped = plan(&e, Operation::Stop, 5, "ignored", StopSemantics::Stopped).unwrap();
        assert_eq!(stopped.to, Stopped);
    }

    #[test]
    fn insert_events_cover_all_three_kinds() {
        assert_eq!(INSERT_EVENTS.len(), 3);
        assert!(!INSERT_EVENTS.contains(CacheEventKind::ConfirmStatus));
    }
}
