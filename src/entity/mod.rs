//! Supervised entity data model.
//!
//! ## Contents
//! - [`EntityKind`], [`EntityKey`] identify a process, equipment or sub-equipment
//! - [`SupervisionStatus`] the six supervision states and their active/inactive class
//! - [`SupervisedEntity`] the cached record mutated by the state machine
//! - [`SupervisionEvent`] immutable status observation
//!
//! Status fields of [`SupervisedEntity`] are readable by anyone but writable only
//! from inside the crate (state machine and store), so listeners holding a copy
//! cannot forge a transition.

mod event;
mod key;
mod status;
mod supervised;

pub use event::SupervisionEvent;
pub use key::{EntityKey, EntityKind};
pub use status::SupervisionStatus;
pub use supervised::SupervisedEntity;
