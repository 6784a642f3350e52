//! # Expiry scanner.
//!
//! Background loop calling [`SupervisionManager::scan_expired`] every period with
//! the wall-clock time. Holds only a weak reference, so a dropped manager ends it.
//!
//! ```text
//! loop {
//!   select! {
//!     token.cancelled() ─► exit
//!     ticker.tick()     ─► manager.scan_expired(now_millis())
//!   }
//! }
//! ```

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::clock::now_millis;
use super::manager::SupervisionManager;

pub(super) fn spawn(
    manager: Weak<SupervisionManager>,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        tracing::info!(?period, "expiry scanner started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(m) = manager.upgrade() else { break };
                    let suspended = m.scan_expired(now_millis()).await;
                    if !suspended.is_empty() {
                        tracing::debug!(entities = suspended.len(), "expiry scan suspended entities");
                    }
                }
            }
        }
        tracing::info!("expiry scanner stopped");
    })
}
