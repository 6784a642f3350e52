//! Failure containment for listener callbacks.
//!
//! Every callback runs through [`contained`]: an `Err` is logged at `warn`, a
//! panic is caught with `catch_unwind` and logged at `error`. Neither propagates.
//!
//! `AssertUnwindSafe` is used, so a listener that panics while holding its own
//! lock may leave its own state inconsistent; the cache is never affected because
//! listeners only hold copies.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::ListenerError;

/// Runs a listener callback, containing errors and panics. Returns `true` on success.
pub(crate) async fn contained<F>(listener: &'static str, what: &'static str, fut: F) -> bool
where
    F: Future<Output = Result<(), ListenerError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::warn!(listener, event = what, error = %err, "listener returned an error");
            false
        }
        Err(panic) => {
            let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = panic.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!(listener, event = what, panic = %info, "listener panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn errors_and_panics_are_contained() {
        assert!(contained("ok", "test", async { Ok(()) }).await);
        assert!(!contained("err", "test", async { Err(ListenerError::failed("boom")) }).await);
        assert!(
            !contained("panic", "test", async {
                if true {
                    panic!("listener blew up");
                }
                Ok(())
            })
            .await
        );
    }
}
