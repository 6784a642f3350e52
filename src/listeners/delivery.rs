//! # Delivery strategies.
//!
//! A registration picks exactly one [`Delivery`]. The set is closed; the dispatcher
//! switches on it once at registration time.
//!
//! | Strategy      | Runs on                        | Lock held | Ordering                         |
//! |---------------|--------------------------------|-----------|----------------------------------|
//! | `Synchronous` | mutating task                  | yes       | total per key                    |
//! | `Pooled`      | one worker per key lane        | no        | FIFO per key                     |
//! | `Buffered`    | flush timer                    | no        | batch per period                 |

use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cacheable;

use super::listener::{BatchListener, CacheListener};

/// What a buffered registration accumulates between flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferContent {
    /// Distinct keys only (consumer re-reads current state).
    Keys,
    /// Full object copies.
    Objects,
}

/// How notifications reach a listener.
pub enum Delivery<T: Cacheable> {
    /// Invoked on the mutating task, inside the key lock scope.
    Synchronous(Arc<dyn CacheListener<T>>),

    /// Copies go through `workers` bounded lanes, one task each; a key always
    /// maps to the same lane.
    ///
    /// A full lane blocks the producer until space is available.
    Pooled {
        listener: Arc<dyn CacheListener<T>>,
        workers: usize,
        queue_capacity: usize,
    },

    /// Keys or copies accumulate and are flushed every `period` as one batch.
    Buffered {
        listener: Arc<dyn BatchListener<T>>,
        period: Duration,
        content: BufferContent,
    },
}

impl<T: Cacheable> Delivery<T> {
    pub fn synchronous(listener: Arc<dyn CacheListener<T>>) -> Self {
        Delivery::Synchronous(listener)
    }

    /// Pooled delivery; `workers` and `queue_capacity` are clamped to at least 1.
    pub fn pooled(listener: Arc<dyn CacheListener<T>>, workers: usize, queue_capacity: usize) -> Self {
        Delivery::Pooled {
            listener,
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn buffered(
        listener: Arc<dyn BatchListener<T>>,
        period: Duration,
        content: BufferContent,
    ) -> Self {
        Delivery::Buffered {
            listener,
            period,
            content,
        }
    }

    /// Stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Delivery::Synchronous(_) => "synchronous",
            Delivery::Pooled { .. } => "pooled",
            Delivery::Buffered { .. } => "buffered",
        }
    }

    pub(crate) fn listener_name(&self) -> &'static str {
        match self {
            Delivery::Synchronous(l) => l.name(),
            Delivery::Pooled { listener, .. } => listener.name(),
            Delivery::Buffered { listener, .. } => listener.name(),
        }
    }
}
