//! Messages exchanged between the watcher and the orchestrator

use std::path::PathBuf;

use chrono::{DateTime, Local};

/// A settled dump file, ready for processing.
///
/// Produced by the watcher once the settle delay has passed and the machine
/// name has been extracted; consumed by the orchestrator, which assigns the
/// report its identity from `(machine_name, detected_at)`.
#[derive(Debug, Clone)]
pub struct DumpJob {
  pub path: PathBuf,
  pub machine_name: String,
  pub detected_at: DateTime<Local>,
}
