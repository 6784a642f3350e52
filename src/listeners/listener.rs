//! # Listener traits
//!
//! [`CacheListener`] is the extension point for per-object consumers (synchronous
//! and pooled delivery); [`BatchListener`] receives accumulated batches (buffered
//! delivery).
//!
//! ## Contract
//! - The object received is an independent deep copy owned by the listener.
//! - Returning `Err` or panicking is contained by the dispatcher: it is logged and
//!   never affects other listeners or the mutating caller.
//! - `ConfirmStatus` deliveries restate the current state after a restart and must
//!   be handled idempotently.

use async_trait::async_trait;

use crate::cache::Cacheable;
use crate::error::ListenerError;
use crate::events::CacheEventKind;

/// Consumer of single cache notifications.
#[async_trait]
pub trait CacheListener<T: Cacheable>: Send + Sync + 'static {
    /// Handles one notification.
    ///
    /// # Parameters
    /// - `kind`: why the object is delivered
    /// - `object`: deep copy of the affected object, taken under its key lock
    async fn on_event(&self, kind: CacheEventKind, object: T) -> Result<(), ListenerError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Accumulated content handed to a [`BatchListener`] on each flush.
#[derive(Debug)]
pub enum Batch<T: Cacheable> {
    /// Distinct keys touched since the previous flush, in first-seen order.
    Keys(Vec<T::Key>),
    /// Every delivered copy since the previous flush, in arrival order.
    Objects(Vec<T>),
}

impl<T: Cacheable> Batch<T> {
    pub fn len(&self) -> usize {
        match self {
            Batch::Keys(k) => k.len(),
            Batch::Objects(o) => o.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer of periodically flushed batches.
#[async_trait]
pub trait BatchListener<T: Cacheable>: Send + Sync + 'static {
    /// Handles one flushed batch (never empty).
    async fn on_batch(&self, batch: Batch<T>) -> Result<(), ListenerError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
