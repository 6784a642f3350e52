//! # Broadcast bus for supervision events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] carrying every
//! accepted [`SupervisionEvent`] to audit, persistence and client layers.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Receivers (any number):
//!   admin commands ──┐
//!   alive signals  ──┼──► Bus ──────────► audit log / persistence / client push
//!   comm faults    ──┤  (broadcast chan)
//!   expiry scanner ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Per-entity order**: publishers hold the entity lock while publishing.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use crate::entity::SupervisionEvent;

/// Broadcast channel of supervision events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<SupervisionEvent>,
}

impl Bus {
    /// Creates a new bus with the given ring-buffer capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<SupervisionEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: SupervisionEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisionEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
