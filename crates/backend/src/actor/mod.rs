//! Task-based concurrency for the dump pipeline
//!
//! Detection flows through message passing rather than shared callbacks:
//!
//! ```text
//! notify -> WatcherTask -> OrchestratorHandle -> Orchestrator
//!                                                   └── one analysis task per dump
//! ```
//!
//! - [`WatcherTask`]: bridges filesystem notifications into [`message::DumpJob`]s
//! - [`Orchestrator`]: owns the record store writes and spawns analysis tasks
//!
//! The only shared mutable state is the `ReportStore`; everything else is
//! owned by its task and reached through an mpsc handle.

pub mod handle;
pub mod message;
mod orchestrator;
mod watcher;

#[cfg(test)]
mod __tests__;

pub use orchestrator::Orchestrator;
pub use watcher::{DEFAULT_SETTLE_DELAY, WatcherConfig, WatcherError, WatcherTask};
