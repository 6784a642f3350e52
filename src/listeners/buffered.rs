//! # Buffered (batched) delivery.
//!
//! ```text
//! push(copy) ──► Buffer { keys | objects } ──(every period)──► listener.on_batch(batch)
//! ```
//!
//! ## Rules
//! - `Keys` mode keeps each key once per period (first-seen order).
//! - `Objects` mode keeps every copy in arrival order; a notification raising
//!   several kinds contributes one copy.
//! - Empty periods produce no call.
//! - Flushes are serialized: batches reach the listener in accumulation order.
//! - Close performs a final flush before returning.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::Cacheable;

use super::contain::contained;
use super::delivery::BufferContent;
use super::listener::{Batch, BatchListener};

struct Buffer<T: Cacheable> {
    content: BufferContent,
    keys: Vec<T::Key>,
    seen: HashSet<T::Key>,
    objects: Vec<T>,
}

impl<T: Cacheable> Buffer<T> {
    fn new(content: BufferContent) -> Self {
        Self {
            content,
            keys: Vec::new(),
            seen: HashSet::new(),
            objects: Vec::new(),
        }
    }

    fn push(&mut self, object: T) {
        match self.content {
            BufferContent::Keys => {
                let key = object.key();
                if self.seen.insert(key) {
                    self.keys.push(key);
                }
            }
            BufferContent::Objects => self.objects.push(object),
        }
    }

    fn take(&mut self) -> Option<Batch<T>> {
        match self.content {
            BufferContent::Keys if !self.keys.is_empty() => {
                self.seen.clear();
                Some(Batch::Keys(std::mem::take(&mut self.keys)))
            }
            BufferContent::Objects if !self.objects.is_empty() => {
                Some(Batch::Objects(std::mem::take(&mut self.objects)))
            }
            _ => None,
        }
    }
}

struct Shared<T: Cacheable> {
    name: &'static str,
    buffer: Mutex<Buffer<T>>,
    gate: Mutex<()>,
    listener: Arc<dyn BatchListener<T>>,
}

impl<T: Cacheable> Shared<T> {
    async fn flush(&self) -> usize {
        let _gate = self.gate.lock().await;
        let batch = self.buffer.lock().await.take();
        match batch {
            Some(batch) => {
                let n = batch.len();
                contained(self.name, "batch", self.listener.on_batch(batch)).await;
                n
            }
            None => 0,
        }
    }
}

/// Accumulating buffer plus periodic flusher for one listener.
pub(crate) struct BufferedQueue<T: Cacheable> {
    shared: Arc<Shared<T>>,
    token: CancellationToken,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Cacheable> BufferedQueue<T> {
    /// Creates the buffer and spawns its flush timer (must run inside a tokio runtime).
    ///
    /// `period` is clamped to at least 1ms.
    pub(crate) fn spawn(
        listener: Arc<dyn BatchListener<T>>,
        period: Duration,
        content: BufferContent,
    ) -> Self {
        let shared = Arc::new(Shared {
            name: listener.name(),
            buffer: Mutex::new(Buffer::new(content)),
            gate: Mutex::new(()),
            listener,
        });
        let token = CancellationToken::new();
        let period = period.max(Duration::from_millis(1));

        let s = Arc::clone(&shared);
        let t = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = t.cancelled() => break,
                    _ = ticker.tick() => {
                        s.flush().await;
                    }
                }
            }
            s.flush().await;
        });

        Self {
            shared,
            token,
            flusher: Mutex::new(Some(handle)),
        }
    }

    /// Adds one copy to the buffer.
    pub(crate) async fn push(&self, object: T) {
        if self.token.is_cancelled() {
            tracing::debug!(listener = self.shared.name, "buffer closed; delivery skipped");
            return;
        }
        self.shared.buffer.lock().await.push(object);
    }

    /// Flushes immediately; returns the number of items delivered.
    pub(crate) async fn flush(&self) -> usize {
        self.shared.flush().await
    }

    /// Stops the timer after a final flush.
    pub(crate) async fn close(&self) {
        self.token.cancel();
        if let Some(h) = self.flusher.lock().await.take() {
            if h.await.is_err() {
                tracing::error!(listener = self.shared.name, "buffer flusher aborted");
            }
        }
    }
}
