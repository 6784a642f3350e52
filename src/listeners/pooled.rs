//! # Pooled-asynchronous delivery.
//!
//! ```text
//! push(kind, copy) ──► hash(key) ──┬──► [bounded lane 1] ──► worker 1 ──► listener.on_event()
//!   (awaits when full)             ├──► [bounded lane 2] ──► worker 2 ──► listener.on_event()
//!                                  └──► [bounded lane N] ──► worker N ──► listener.on_event()
//! ```
//!
//! ## Rules
//! - **Backpressure**: a full lane suspends the producer; nothing is dropped.
//! - **Per-key order**: every copy of one key goes to the same lane, so the
//!   listener sees a key's copies one at a time, in push order. Different keys
//!   are served in parallel.
//! - **Isolation**: errors and panics are contained per invocation; the worker
//!   keeps serving its lane.
//! - **Close**: drops the senders and waits for workers to drain their lanes.

use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::cache::Cacheable;
use crate::events::CacheEventKind;

use super::contain::contained;
use super::listener::CacheListener;

type Job<T> = (CacheEventKind, T);

/// Bounded lanes plus one worker per lane for one listener.
pub(crate) struct PooledQueue<T: Cacheable> {
    name: &'static str,
    hasher: RandomState,
    lanes: Mutex<Option<Vec<mpsc::Sender<Job<T>>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Cacheable> PooledQueue<T> {
    /// Creates `workers` lanes of `queue_capacity` each and spawns their workers
    /// (must run inside a tokio runtime).
    pub(crate) fn spawn(
        listener: Arc<dyn CacheListener<T>>,
        workers: usize,
        queue_capacity: usize,
    ) -> Self {
        let name = listener.name();
        let mut lanes = Vec::with_capacity(workers.max(1));
        let mut handles = Vec::with_capacity(workers.max(1));

        for worker in 0..workers.max(1) {
            let (tx, mut rx) = mpsc::channel::<Job<T>>(queue_capacity.max(1));
            let l = Arc::clone(&listener);
            handles.push(tokio::spawn(async move {
                while let Some((kind, object)) = rx.recv().await {
                    contained(name, kind.as_label(), l.on_event(kind, object)).await;
                }
                tracing::trace!(listener = name, worker, "pool worker stopped");
            }));
            lanes.push(tx);
        }

        Self {
            name,
            hasher: RandomState::new(),
            lanes: Mutex::new(Some(lanes)),
            workers: Mutex::new(handles),
        }
    }

    /// Enqueues one copy on its key's lane, waiting while the lane is full.
    pub(crate) async fn push(&self, kind: CacheEventKind, object: T) {
        let tx = match self.lanes.lock().await.as_ref() {
            Some(lanes) => {
                let lane = self.hasher.hash_one(object.key()) as usize % lanes.len();
                lanes[lane].clone()
            }
            None => {
                tracing::debug!(listener = self.name, event = %kind, "pool closed; delivery skipped");
                return;
            }
        };
        if tx.send((kind, object)).await.is_err() {
            tracing::warn!(listener = self.name, event = %kind, "pool workers gone; delivery lost");
        }
    }

    /// Stops accepting copies and waits until every queued copy is delivered.
    pub(crate) async fn close(&self) {
        drop(self.lanes.lock().await.take());
        let handles = std::mem::take(&mut *self.workers.lock().await);
        for h in handles {
            if h.await.is_err() {
                tracing::error!(listener = self.name, "pool worker aborted");
            }
        }
    }
}
