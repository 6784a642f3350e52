//! Runtime core: wiring, signal routing and lifecycle.
//!
//! The public API from this module is [`SupervisionManager`] (built through
//! [`ManagerBuilder`]) with its [`SupervisionConfig`].
//!
//! Internal modules:
//! - [`manager`]: owns the stores, routes control tags, runs admin commands;
//! - [`scanner`]: periodic alive-timer expiry scan;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`clock`]: wall-clock milliseconds.

mod builder;
mod clock;
mod config;
mod manager;
mod scanner;
mod shutdown;

pub use builder::ManagerBuilder;
pub use clock::now_millis;
pub use config::SupervisionConfig;
pub use manager::{SignalOutcome, SupervisionManager};
