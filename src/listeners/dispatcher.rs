//! # Cache event dispatcher.
//!
//! Fans notifications for one cache out to its registered listeners.
//!
//! ```text
//! mutating task (key lock held)
//!   └─► notify_synchronous(kinds, &obj)
//!         ├─► sync listener A.on_event(kind, copy)
//!         ├─► sync listener B.on_event(kind, copy)
//!         └─► PendingDelivery { kinds, snapshot }
//! mutating task (key lock released)
//!   └─► deliver(pending)
//!         ├─► pooled queue   ◄── copy per kind
//!         └─► buffered queue ◄── one copy per notification
//! ```
//!
//! ## Rules
//! - Every listener gets its own deep copy; no two listeners share an object.
//! - Synchronous listeners run in registration order, each kind in declaration order.
//! - A listener registered for a set of kinds only sees deliveries of those kinds.
//! - Listener failures (errors and panics) are contained and logged.
//! - Registrations of pooled/buffered strategies spawn tasks and therefore require
//!   a tokio runtime.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::cache::Cacheable;
use crate::events::{CacheEventKind, EventSet};

use super::buffered::BufferedQueue;
use super::contain::contained;
use super::delivery::Delivery;
use super::listener::CacheListener;
use super::pooled::PooledQueue;

/// Handle returned by [`CacheDispatcher::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

enum Sink<T: Cacheable> {
    Synchronous(Arc<dyn CacheListener<T>>),
    Pooled(PooledQueue<T>),
    Buffered(BufferedQueue<T>),
}

impl<T: Cacheable> Sink<T> {
    fn is_deferred(&self) -> bool {
        !matches!(self, Sink::Synchronous(_))
    }

    async fn close(&self) {
        match self {
            Sink::Synchronous(_) => {}
            Sink::Pooled(q) => q.close().await,
            Sink::Buffered(q) => q.close().await,
        }
    }
}

struct Registration<T: Cacheable> {
    id: RegistrationId,
    name: &'static str,
    kinds: EventSet,
    sink: Sink<T>,
}

/// Work left after the synchronous phase: the snapshot owed to deferred listeners.
///
/// Must be passed to [`CacheDispatcher::deliver`] after the key lock is released.
#[must_use = "deferred listeners only see the event once the pending delivery is delivered"]
pub struct PendingDelivery<T: Cacheable> {
    kinds: EventSet,
    snapshot: Option<T>,
}

impl<T: Cacheable> PendingDelivery<T> {
    /// A pending delivery that carries nothing.
    pub fn none() -> Self {
        Self {
            kinds: EventSet::EMPTY,
            snapshot: None,
        }
    }

    /// True if no deferred listener is owed a copy.
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// # Listener registry and fan-out for one cache.
pub struct CacheDispatcher<T: Cacheable> {
    cache: &'static str,
    next_id: AtomicU64,
    registrations: DashMap<RegistrationId, Arc<Registration<T>>>,
}

impl<T: Cacheable> CacheDispatcher<T> {
    /// Creates an empty dispatcher; `cache` names the cache in logs.
    pub fn new(cache: &'static str) -> Self {
        Self {
            cache,
            next_id: AtomicU64::new(1),
            registrations: DashMap::new(),
        }
    }

    /// Registers a listener for `kinds` with the given delivery strategy.
    ///
    /// Pooled and buffered strategies spawn their workers here.
    pub fn register(&self, kinds: impl Into<EventSet>, delivery: Delivery<T>) -> RegistrationId {
        let kinds = kinds.into();
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = delivery.listener_name();
        let strategy = delivery.as_label();

        let sink = match delivery {
            Delivery::Synchronous(listener) => Sink::Synchronous(listener),
            Delivery::Pooled {
                listener,
                workers,
                queue_capacity,
            } => Sink::Pooled(PooledQueue::spawn(listener, workers, queue_capacity)),
            Delivery::Buffered {
                listener,
                period,
                content,
            } => Sink::Buffered(BufferedQueue::spawn(listener, period, content)),
        };

        self.registrations.insert(
            id,
            Arc::new(Registration {
                id,
                name,
                kinds,
                sink,
            }),
        );
        tracing::debug!(cache = self.cache, %id, listener = name, strategy, ?kinds, "listener registered");
        id
    }

    /// Removes a registration, draining its queue or flushing its buffer.
    ///
    /// Returns `false` if the id is unknown.
    pub async fn deregister(&self, id: RegistrationId) -> bool {
        let Some((_, reg)) = self.registrations.remove(&id) else {
            return false;
        };
        reg.sink.close().await;
        tracing::debug!(cache = self.cache, %id, listener = reg.name, "listener deregistered");
        true
    }

    /// Deregisters every listener.
    pub async fn shutdown(&self) {
        let mut ids: Vec<RegistrationId> = self.registrations.iter().map(|r| *r.key()).collect();
        ids.sort_unstable();
        for id in ids {
            self.deregister(id).await;
        }
    }

    /// Number of current registrations.
    pub fn listener_count(&self) -> usize {
        self.registrations.len()
    }

    /// Forces every buffered registration to flush now.
    pub async fn flush_buffers(&self) {
        for reg in self.matching(EventSet::all()) {
            if let Sink::Buffered(q) = &reg.sink {
                q.flush().await;
            }
        }
    }

    /// Runs synchronous listeners for `kinds` and snapshots `object` for deferred ones.
    ///
    /// Call while holding the key lock of `object`.
    pub async fn notify_synchronous(&self, kinds: EventSet, object: &T) -> PendingDelivery<T> {
        if kinds.is_empty() {
            return PendingDelivery::none();
        }
        let regs = self.matching(kinds);
        let mut deferred = false;

        for kind in kinds.iter() {
            for reg in regs.iter().filter(|r| r.kinds.contains(kind)) {
                match &reg.sink {
                    Sink::Synchronous(listener) => {
                        contained(reg.name, kind.as_label(), listener.on_event(kind, object.deep_copy()))
                            .await;
                    }
                    _ => deferred = true,
                }
            }
        }

        PendingDelivery {
            kinds,
            snapshot: deferred.then(|| object.deep_copy()),
        }
    }

    /// Hands the snapshot to pooled and buffered listeners.
    ///
    /// Call after the key lock has been released; awaits while a pooled queue is full.
    pub async fn deliver(&self, pending: PendingDelivery<T>) {
        let Some(snapshot) = pending.snapshot else {
            return;
        };
        let kinds = pending.kinds;

        for reg in self.matching(kinds).iter().filter(|r| r.sink.is_deferred()) {
            match &reg.sink {
                Sink::Pooled(q) => {
                    for kind in kinds.iter().filter(|k| reg.kinds.contains(*k)) {
                        q.push(kind, snapshot.deep_copy()).await;
                    }
                }
                // a batch entry carries no kind
                Sink::Buffered(q) => q.push(snapshot.deep_copy()).await,
                Sink::Synchronous(_) => {}
            }
        }
    }

    /// Both phases back to back, for callers that hold no lock.
    pub async fn notify(&self, kinds: impl Into<EventSet>, object: &T) {
        let pending = self.notify_synchronous(kinds.into(), object).await;
        self.deliver(pending).await;
    }

    /// Convenience for a single kind.
    pub async fn notify_one(&self, kind: CacheEventKind, object: &T) {
        self.notify(kind, object).await;
    }

    fn matching(&self, kinds: EventSet) -> Vec<Arc<Registration<T>>> {
        let mut regs: Vec<Arc<Registration<T>>> = self
            .registrations
            .iter()
            .filter(|r| r.kinds.intersects(kinds))
            .map(|r| Arc::clone(r.value()))
            .collect();
        regs.sort_unstable_by_key(|r| r.id);
        regs
    }
}
