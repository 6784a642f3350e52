//! Cache event kinds and the supervision event bus.
//!
//! ## Contents
//! - [`CacheEventKind`], [`EventSet`] classification of cache notifications
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` carrying [`SupervisionEvent`]s
//!
//! ## Quick reference
//! - **Cache notifications** go through [`CacheDispatcher`](crate::CacheDispatcher)
//!   and carry a deep copy of the affected object.
//! - **Supervision events** go through [`Bus`]: one event per accepted status write,
//!   published while the entity lock is held so per-entity order is preserved.
//!
//! [`SupervisionEvent`]: crate::SupervisionEvent

mod bus;
mod kind;

pub use bus::Bus;
pub use kind::{CacheEventKind, EventSet};
