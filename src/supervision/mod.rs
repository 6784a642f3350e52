//! # Supervision of processes, equipment and sub-equipment.
//!
//! - [`plan`] / [`apply`] - pure transition rules of the state machine.
//! - [`SupervisionService`] - locked read-modify-write-notify sequences over the
//!   entity store.
//! - [`CommandOutcome`] - accepted/rejected verdict plus the authoritative state.

mod machine;
mod outcome;
mod service;

pub use machine::{
    INSERT_EVENTS, Operation, Rejection, StopSemantics, Transition, apply, events_for, plan,
};
pub use outcome::{CommandOutcome, Verdict};
pub use service::SupervisionService;
