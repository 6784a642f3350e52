//! # Supervision configuration.
//!
//! Provides [`SupervisionConfig`], the settings of one [`SupervisionManager`](crate::SupervisionManager).
//!
//! ## Sentinel values
//! - `expiry_scan_period = 0s` → no background expiry scanner (call `scan_expired` yourself)
//! - `grace = 0s` → shutdown does not wait for listener queues to drain

use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cacheable;
use crate::listeners::{BatchListener, BufferContent, CacheListener, Delivery};
use crate::supervision::StopSemantics;

/// Configuration of the supervision core.
///
/// ## Field semantics
/// - `alive_tolerance_factor`: alive signals delayed by more than `factor × interval` are stale
/// - `expiry_scan_period`: period of the background expiry scan (`0s` = disabled)
/// - `stop_status`: status an entity lands in when stopped
/// - `bus_capacity`: supervision event bus ring buffer size (min 1; clamped by Bus)
/// - `pool_workers` / `pool_queue_capacity`: defaults for pooled listeners
/// - `buffer_flush_period`: default flush period for buffered listeners
/// - `grace`: maximum wait for listener queues to drain on shutdown
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over checking sentinels inline.
#[derive(Clone, Debug)]
pub struct SupervisionConfig {
    /// Multiple of the alive interval beyond which a delayed alive signal is dropped.
    pub alive_tolerance_factor: u64,

    /// Period of the expiry scanner.
    ///
    /// - `Duration::ZERO` = scanner disabled
    /// - `> 0` = every period, silent alive timers suspend their owner
    pub expiry_scan_period: Duration,

    /// Target of `stop`: `DOWN` or `STOPPED`.
    pub stop_status: StopSemantics,

    /// Capacity of the supervision event bus.
    pub bus_capacity: usize,

    /// Worker count of pooled listeners built by [`pooled`](Self::pooled).
    pub pool_workers: usize,

    /// Queue capacity of pooled listeners built by [`pooled`](Self::pooled).
    ///
    /// A full queue blocks the producer.
    pub pool_queue_capacity: usize,

    /// Flush period of buffered listeners built by [`buffered`](Self::buffered).
    pub buffer_flush_period: Duration,

    /// Maximum time to wait for listener queues and buffers to drain on shutdown.
    ///
    /// Exceeding it returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,
}

impl SupervisionConfig {
    /// Returns the scan period as an `Option` (`None` = scanner disabled).
    #[inline]
    pub fn scan_period(&self) -> Option<Duration> {
        if self.expiry_scan_period == Duration::ZERO {
            None
        } else {
            Some(self.expiry_scan_period)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Pooled delivery with the configured worker count and queue capacity.
    pub fn pooled<T: Cacheable>(&self, listener: Arc<dyn CacheListener<T>>) -> Delivery<T> {
        Delivery::pooled(listener, self.pool_workers, self.pool_queue_capacity)
    }

    /// Buffered delivery with the configured flush period.
    pub fn buffered<T: Cacheable>(
        &self,
        listener: Arc<dyn BatchListener<T>>,
        content: BufferContent,
    ) -> Delivery<T> {
        Delivery::buffered(listener, self.buffer_flush_period, content)
    }
}

impl Default for SupervisionConfig {
    /// Default configuration:
    ///
    /// - `alive_tolerance_factor = 2`
    /// - `expiry_scan_period = 1s`
    /// - `stop_status = StopSemantics::Stopped`
    /// - `bus_capacity = 1024`
    /// - `pool_workers = 4`, `pool_queue_capacity = 1024`
    /// - `buffer_flush_period = 500ms`
    /// - `grace = 10s`
    fn default() -> Self {
        Self {
            alive_tolerance_factor: 2,
            expiry_scan_period: Duration::from_secs(1),
            stop_status: StopSemantics::Stopped,
            bus_capacity: 1024,
            pool_workers: 4,
            pool_queue_capacity: 1024,
            buffer_flush_period: Duration::from_millis(500),
            grace: Duration::from_secs(10),
        }
    }
}
