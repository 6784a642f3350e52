//! # tagvisor
//!
//! **Tagvisor** is the supervision core of an industrial monitoring server.
//!
//! It decides from liveness signals whether acquisition processes, equipment and
//! sub-equipment are up or down, drives an explicit supervision state machine,
//! and propagates every change to cache listeners and dependent data tags.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   alive tags        comm-fault tags        admin commands
//!       │                   │                      │
//!       ▼                   ▼                      │
//! ┌───────────────────────────────────────┐        │
//! │  SupervisionManager                   │◄───────┘
//! │  - LivenessTracker (alive timers)     │
//! │  - CommFaultInterpreter               │
//! │  - expiry scanner (periodic)          │
//! └──────────────────┬────────────────────┘
//!                    ▼  start / stop / suspend / resume
//! ┌───────────────────────────────────────┐
//! │  SupervisionService                   │
//! │  lock(key) ─► plan ─► apply ─► notify │
//! │  KeyedCache<SupervisedEntity>         │
//! └──────┬──────────────┬─────────────────┘
//!        ▼              ▼
//!       Bus      CacheDispatcher<SupervisedEntity>
//!  (broadcast)    ├─► Synchronous listeners (under the key lock)
//!                 ├─► Pooled listeners ─► TagSupervisionNotifier ─► TagStore
//!                 └─► Buffered listeners                              │
//!                                                                     ▼
//!                                                   CacheDispatcher<DataTag>
//! ```
//!
//! ### Supervision states
//! ```text
//! active:   STARTUP  RUNNING  RUNNING_LOCAL
//! inactive: DOWN     STOPPED  UNCERTAIN
//!
//! every accepted write        ─► SUPERVISION_UPDATE
//! write crossing active/inactive ─► + SUPERVISION_CHANGE
//! first insertion             ─► UPDATE_ACCEPTED + SUPERVISION_UPDATE + SUPERVISION_CHANGE
//! restart                     ─► CONFIRM_STATUS for every entity
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                              |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **Supervision**   | State machine and locked status writes.                       | [`SupervisionService`], [`plan`], [`CommandOutcome`] |
//! | **Liveness**      | Alive timers, comm-fault interpretation, control-tag routing. | [`LivenessTracker`], [`CommFaultInterpreter`]   |
//! | **Listeners**     | Synchronous, pooled and buffered delivery of deep copies.     | [`CacheListener`], [`BatchListener`], [`Delivery`] |
//! | **Tags**          | Data tags stamped with their supervisors' status.             | [`TagStore`], [`DataTag`]                       |
//! | **Runtime**       | Wiring, expiry scan and graceful shutdown.                    | [`SupervisionManager`], [`ManagerBuilder`]      |
//! | **Errors**        | Typed errors for lookups, configuration and runtime.          | [`SupervisionError`], [`RuntimeError`]          |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use tagvisor::{
//!     CommFaultTag, ControlTagUpdate, EntityKey, ManagerBuilder, SupervisedEntity,
//!     SupervisionConfig, SupervisionStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ManagerBuilder::new(SupervisionConfig::default()).build()?;
//!
//!     manager.configure_entity(SupervisedEntity::process(1, "P_DEMO", 10)).await?;
//!     manager
//!         .configure_entity(
//!             SupervisedEntity::equipment(2, "E_PLC", 20)
//!                 .with_parent(EntityKey::process(1))
//!                 .with_comm_fault(21),
//!         )
//!         .await?;
//!     manager.configure_comm_fault(CommFaultTag::new(21, EntityKey::equipment(2), false))?;
//!
//!     // Link reports "up"
//!     manager
//!         .process_control_tag(ControlTagUpdate::new(21, true).with_source_ts(6000), 6000)
//!         .await?;
//!     let ev = manager.entities().event(EntityKey::equipment(2)).await?;
//!     assert_eq!(ev.status, SupervisionStatus::Running);
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod cache;
mod core;
mod entity;
mod error;
mod events;
mod listeners;
mod liveness;
mod supervision;
mod tags;

// ---- Public re-exports ----

pub use cache::{Cacheable, KeyedCache};
pub use crate::core::{ManagerBuilder, SignalOutcome, SupervisionConfig, SupervisionManager, now_millis};
pub use entity::{EntityKey, EntityKind, SupervisedEntity, SupervisionEvent, SupervisionStatus};
pub use error::{ListenerError, RuntimeError, SupervisionError};
pub use events::{Bus, CacheEventKind, EventSet};
pub use listeners::{
    Batch, BatchListener, BufferContent, CacheDispatcher, CacheListener, Delivery,
    PendingDelivery, RegistrationId,
};
pub use liveness::{
    AliveSignal, AliveVerdict, CommFaultInterpreter, CommFaultSignal, CommFaultTag,
    ControlTagUpdate, Expiry, Interpretation, LivenessRecord, LivenessTracker, TagValue,
};
pub use supervision::{
    CommandOutcome, INSERT_EVENTS, Operation, Rejection, StopSemantics, SupervisionService,
    Transition, Verdict, apply, events_for, plan,
};
pub use tags::{DataTag, TagStore, TagSupervisionNotifier};

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
