//! # Cache listeners and their delivery.
//!
//! This module provides the [`CacheListener`] / [`BatchListener`] traits, the
//! closed set of [`Delivery`] strategies and the [`CacheDispatcher`] that fans
//! cache notifications out to registrations.
//!
//! ## Architecture
//! ```text
//! mutation (key lock held) ── notify_synchronous ──► Synchronous listeners
//!          │                          │
//!          │                     PendingDelivery
//!   lock released                     │
//!          └──────────── deliver ─────┴──► PooledQueue   ──► lane per key ──► on_event()
//!                                     └──► BufferedQueue ──► timer        ──► on_batch()
//! ```
//!
//! ## Implementing a listener
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tagvisor::{
//!     CacheDispatcher, CacheEventKind, CacheListener, Delivery, ListenerError, SupervisedEntity,
//! };
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl CacheListener<SupervisedEntity> for Audit {
//!     async fn on_event(&self, kind: CacheEventKind, entity: SupervisedEntity) -> Result<(), ListenerError> {
//!         println!("{kind} {} {}", entity.key(), entity.supervision_status());
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo(dispatcher: &CacheDispatcher<SupervisedEntity>) {
//! dispatcher.register(CacheEventKind::SupervisionChange, Delivery::pooled(Arc::new(Audit), 2, 64));
//! # }
//! ```

mod buffered;
mod contain;
mod delivery;
mod dispatcher;
mod listener;
mod pooled;

#[cfg(feature = "logging")]
mod log;

pub use delivery::{BufferContent, Delivery};
pub use dispatcher::{CacheDispatcher, PendingDelivery, RegistrationId};
pub use listener::{Batch, BatchListener, CacheListener};

#[cfg(feature = "logging")]
pub use log::LogWriter;
