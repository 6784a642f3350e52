//! Error types used by the supervision core and its listeners.
//!
//! This module defines three enums:
//!
//! - [`SupervisionError`] - lookup and configuration failures surfaced to callers.
//! - [`ListenerError`] - failures reported by listener callbacks (always contained).
//! - [`RuntimeError`] - failures of the manager runtime itself (shutdown).
//!
//! Stale signals and invalid transitions are **not** errors: they are reported as
//! [`Rejection`](crate::Rejection) outcomes.
//!
//! All types provide `as_label` (stable snake_case for logs/metrics) and `as_message`.

use std::time::Duration;
use thiserror::Error;

use crate::entity::EntityKey;

/// # Errors produced by the supervision core.
///
/// Acting on an id the core does not know indicates a configuration inconsistency
/// upstream, so these are never silently ignored.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisionError {
    /// No supervised entity is configured under this key.
    #[error("unknown supervised entity {key}")]
    UnknownEntity {
        /// Key that failed to resolve.
        key: EntityKey,
    },

    /// No data tag is configured under this id.
    #[error("unknown data tag {id}")]
    UnknownTag {
        /// Tag id that failed to resolve.
        id: u64,
    },

    /// The control tag is neither a registered alive tag nor a comm-fault tag.
    #[error("control tag {id} is not a registered alive or comm-fault tag")]
    UnknownControlTag {
        /// Control tag id that failed to resolve.
        id: u64,
    },

    /// An object with the same key is already configured.
    #[error("{what} {id} is already configured")]
    AlreadyConfigured {
        /// Kind of object (`"entity"`, `"tag"`, `"alive tag"`, ...).
        what: &'static str,
        /// Offending id, rendered.
        id: String,
    },

    /// The configuration of an object is inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong.
        reason: String,
    },
}

impl SupervisionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tagvisor::{EntityKey, SupervisionError};
    ///
    /// let err = SupervisionError::UnknownEntity { key: EntityKey::equipment(7) };
    /// assert_eq!(err.as_label(), "unknown_entity");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisionError::UnknownEntity { .. } => "unknown_entity",
            SupervisionError::UnknownTag { .. } => "unknown_tag",
            SupervisionError::UnknownControlTag { .. } => "unknown_control_tag",
            SupervisionError::AlreadyConfigured { .. } => "already_configured",
            SupervisionError::InvalidConfiguration { .. } => "invalid_configuration",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SupervisionError::UnknownEntity { key } => format!("entity not found: {key}"),
            SupervisionError::UnknownTag { id } => format!("tag not found: {id}"),
            SupervisionError::UnknownControlTag { id } => format!("control tag not found: {id}"),
            SupervisionError::AlreadyConfigured { what, id } => {
                format!("duplicate {what}: {id}")
            }
            SupervisionError::InvalidConfiguration { reason } => format!("config: {reason}"),
        }
    }
}

/// # Errors reported by listener callbacks.
///
/// The dispatcher logs these and carries on; they never reach the mutating caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// The listener could not process the delivery.
    #[error("listener failed: {message}")]
    Failed {
        /// The underlying error message.
        message: String,
    },
}

impl ListenerError {
    /// Shorthand for [`ListenerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::Failed { .. } => "listener_failed",
        }
    }
}

/// # Errors produced by the manager runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Listener queues did not drain within the grace period.
    #[error("shutdown timeout {grace:?} exceeded while draining listeners")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to install shutdown signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tagvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace } => format!("grace exceeded after {grace:?}"),
            RuntimeError::Signal(e) => format!("signal handler: {e}"),
        }
    }
}
