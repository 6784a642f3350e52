//! # Liveness of supervised entities.
//!
//! ```text
//! ControlTagUpdate ─┬─ alive tag ──────► LivenessTracker.observe ─► resume / (stale: drop)
//!                   └─ comm-fault tag ─► CommFaultInterpreter    ─► suspend / resume
//! expiry scan ─────────────────────────► LivenessTracker.expired ─► suspend
//! ```

mod comm_fault;
mod signals;
mod tracker;

pub use comm_fault::{CommFaultInterpreter, CommFaultTag, Interpretation};
pub use signals::{AliveSignal, CommFaultSignal, ControlTagUpdate, TagValue};
pub use tracker::{AliveVerdict, Expiry, LivenessRecord, LivenessTracker};
