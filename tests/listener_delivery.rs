use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use tagvisor::{
    Batch, BatchListener, BufferContent, CacheDispatcher, CacheEventKind, CacheListener,
    Cacheable, Delivery, EventSet, ListenerError,
};

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    id: u64,
    seq: u32,
    labels: Vec<String>,
}

impl Cacheable for Reading {
    type Key = u64;

    fn key(&self) -> u64 {
        self.id
    }

    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

fn reading(id: u64, seq: u32) -> Reading {
    Reading {
        id,
        seq,
        labels: vec!["orig".into()],
    }
}

/// Waits for a permit before recording each delivery.
struct Gated {
    gate: Arc<Semaphore>,
    seen: Mutex<Vec<u32>>,
}

#[async_trait]
impl CacheListener<Reading> for Gated {
    async fn on_event(&self, _: CacheEventKind, r: Reading) -> Result<(), ListenerError> {
        self.gate
            .acquire()
            .await
            .map_err(|e| ListenerError::failed(e.to_string()))?
            .forget();
        self.seen.lock().await.push(r.seq);
        Ok(())
    }
}

#[derive(Default)]
struct Seqs(Mutex<Vec<u32>>);

#[async_trait]
impl CacheListener<Reading> for Seqs {
    async fn on_event(&self, _: CacheEventKind, r: Reading) -> Result<(), ListenerError> {
        if r.seq == 1 {
            panic!("reading {} rejected", r.seq);
        }
        self.0.lock().await.push(r.seq);
        Ok(())
    }
}

/// Mutates its copy, then records the labels it ended with.
#[derive(Default)]
struct Mutator(Mutex<Vec<Vec<String>>>);

#[async_trait]
impl CacheListener<Reading> for Mutator {
    async fn on_event(&self, _: CacheEventKind, mut r: Reading) -> Result<(), ListenerError> {
        r.labels.push("mutated".into());
        self.0.lock().await.push(r.labels);
        Ok(())
    }
}

#[derive(Default)]
struct Batches(Mutex<Vec<usize>>);

#[async_trait]
impl BatchListener<Reading> for Batches {
    async fn on_batch(&self, batch: Batch<Reading>) -> Result<(), ListenerError> {
        self.0.lock().await.push(batch.len());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn full_pool_queue_blocks_the_producer_without_dropping() {
    let d = CacheDispatcher::<Reading>::new("readings");
    let gated = Arc::new(Gated {
        gate: Arc::new(Semaphore::new(0)),
        seen: Mutex::new(Vec::new()),
    });
    let id = d.register(EventSet::all(), Delivery::pooled(gated.clone(), 1, 1));

    d.notify(CacheEventKind::UpdateAccepted, &reading(1, 0)).await;
    d.notify(CacheEventKind::UpdateAccepted, &reading(1, 1)).await;

    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        d.notify(CacheEventKind::UpdateAccepted, &reading(1, 2)),
    )
    .await;
    assert!(blocked.is_err(), "producer should wait on a full queue");

    gated.gate.add_permits(16);
    d.notify(CacheEventKind::UpdateAccepted, &reading(1, 2)).await;
    assert!(d.deregister(id).await);

    assert_eq!(*gated.seen.lock().await, vec![0, 1, 2]);
}

#[tokio::test]
async fn panicking_pooled_listener_keeps_serving() {
    let d = CacheDispatcher::<Reading>::new("readings");
    let seqs = Arc::new(Seqs::default());
    d.register(CacheEventKind::SupervisionUpdate, Delivery::pooled(seqs.clone(), 1, 8));

    for seq in 0..4 {
        d.notify(CacheEventKind::SupervisionUpdate, &reading(1, seq)).await;
    }
    d.shutdown().await;

    assert_eq!(*seqs.0.lock().await, vec![0, 2, 3]);
}

#[tokio::test]
async fn each_listener_gets_its_own_copy() {
    let d = CacheDispatcher::<Reading>::new("readings");
    let a = Arc::new(Mutator::default());
    let b = Arc::new(Mutator::default());
    d.register(EventSet::all(), Delivery::synchronous(a.clone()));
    d.register(EventSet::all(), Delivery::pooled(b.clone(), 2, 4));

    let original = reading(5, 0);
    d.notify(CacheEventKind::UpdateAccepted, &original).await;
    d.shutdown().await;

    let expected = vec![vec!["orig".to_string(), "mutated".to_string()]];
    assert_eq!(*a.0.lock().await, expected);
    assert_eq!(*b.0.lock().await, expected);
    assert_eq!(original.labels, vec!["orig".to_string()]);
}

#[tokio::test]
async fn deregistered_listener_receives_nothing_more() {
    let d = CacheDispatcher::<Reading>::new("readings");
    let m = Arc::new(Mutator::default());
    let id = d.register(EventSet::all(), Delivery::synchronous(m.clone()));

    d.notify(CacheEventKind::UpdateAccepted, &reading(1, 0)).await;
    assert!(d.deregister(id).await);
    d.notify(CacheEventKind::UpdateAccepted, &reading(1, 1)).await;

    assert_eq!(m.0.lock().await.len(), 1);
    assert_eq!(d.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn buffered_listener_gets_one_batch_per_period() {
    let d = CacheDispatcher::<Reading>::new("readings");
    let batches = Arc::new(Batches::default());
    d.register(
        EventSet::all(),
        Delivery::buffered(batches.clone(), Duration::from_millis(100), BufferContent::Objects),
    );

    for seq in 0..3 {
        d.notify(CacheEventKind::UpdateAccepted, &reading(1, seq)).await;
    }
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(*batches.0.lock().await, vec![3]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(*batches.0.lock().await, vec![3]);

    d.notify(CacheEventKind::UpdateAccepted, &reading(2, 0)).await;
    d.notify(CacheEventKind::UpdateAccepted, &reading(2, 1)).await;
    d.shutdown().await;
    assert_eq!(*batches.0.lock().await, vec![3, 2]);
}
