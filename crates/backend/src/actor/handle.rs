//! Handle for submitting dump jobs to the orchestrator
//!
//! Handles are cheap to clone and safe to share across tasks; each settle
//! task gets its own clone.

use tokio::sync::mpsc;

use super::message::DumpJob;

/// Handle to the orchestrator's job channel.
#[derive(Clone, Debug)]
pub struct OrchestratorHandle {
  tx: mpsc::Sender<DumpJob>,
}

impl OrchestratorHandle {
  pub fn new(tx: mpsc::Sender<DumpJob>) -> Self {
    Self { tx }
  }

  /// Submit a dump for processing.
  pub async fn submit(&self, job: DumpJob) -> Result<(), SendError> {
    self.tx.send(job).await.map_err(|_| SendError::OrchestratorGone)
  }
}

/// Error when sending to the orchestrator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
  #[error("Orchestrator has shut down")]
  OrchestratorGone,
}
