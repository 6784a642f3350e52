//! Data tags and the propagation of supervision status onto them.
//!
//! ## Contents
//! - [`DataTag`] cached tag with its value and per-entity supervision events
//! - [`TagStore`] per-key locked tag cache with its own listener dispatcher
//! - [`TagSupervisionNotifier`] entity listener re-stamping dependent tags

mod notifier;
mod store;
mod tag;

pub use notifier::TagSupervisionNotifier;
pub use store::TagStore;
pub use tag::DataTag;
