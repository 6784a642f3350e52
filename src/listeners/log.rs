//! # LogWriter - cache event printer
//!
//! A minimal listener that logs every notification it receives through `tracing`.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO cache event event="supervision_change" key=process#1 object=SupervisedEntity { .. }
//! ```

use std::fmt::Debug;

use async_trait::async_trait;

use crate::cache::Cacheable;
use crate::error::ListenerError;
use crate::events::CacheEventKind;

use super::listener::CacheListener;

/// Cache event writer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T: Cacheable + Debug> CacheListener<T> for LogWriter {
    async fn on_event(&self, kind: CacheEventKind, object: T) -> Result<(), ListenerError> {
        tracing::info!(event = kind.as_label(), key = %object.key(), ?object, "cache event");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
