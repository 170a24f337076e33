//! Orchestrator - dump lifecycle state machine
//!
//! The orchestrator owns all writes to the record store. For every job it
//! receives it:
//!
//! 1. Creates a `Processing` record and inserts it (overwriting a
//!    same-second collision, last insert wins)
//! 2. Spawns one detached background task that runs the analyzer and lands
//!    the single terminal update for that record
//!
//! There is deliberately no ceiling on concurrent analysis tasks and no
//! queueing: every detected dump gets its own task immediately. Bounding
//! the dump arrival rate is an operator concern. Tasks are never cancelled
//! once started - shutdown stops intake and queries but lets in-flight
//! analysis run to completion in the background.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{handle::OrchestratorHandle, message::DumpJob};
use crate::{
  analyzer::{AnalysisOutcome, DumpAnalyzer},
  domain::report::{DumpReport, DumpStatus},
  store::ReportStore,
};

/// Buffer between the watcher's settle tasks and the orchestrator loop.
const JOB_CHANNEL_CAPACITY: usize = 256;

/// Consumes [`DumpJob`]s and drives each through the processing lifecycle.
pub struct Orchestrator {
  store: Arc<ReportStore>,
  analyzer: Arc<dyn DumpAnalyzer>,
  job_rx: mpsc::Receiver<DumpJob>,
  cancel: CancellationToken,
}

impl Orchestrator {
  /// Create the orchestrator and the handle used to submit jobs to it.
  pub fn new(
    store: Arc<ReportStore>,
    analyzer: Arc<dyn DumpAnalyzer>,
    cancel: CancellationToken,
  ) -> (Self, OrchestratorHandle) {
    let (job_tx, job_rx) = mpsc::channel(JOB_CHANNEL_CAPACITY);
    let orchestrator = Self {
      store,
      analyzer,
      job_rx,
      cancel,
    };
    (orchestrator, OrchestratorHandle::new(job_tx))
  }

  /// Run the event loop until cancelled or all handles are dropped.
  pub async fn run(mut self) {
    info!("Orchestrator started");

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          info!("Orchestrator shutting down (cancelled)");
          break;
        }

        job = self.job_rx.recv() => {
          match job {
            Some(job) => self.submit(job),
            None => {
              info!("Orchestrator shutting down (channel closed)");
              break;
            }
          }
        }
      }
    }

    info!("Orchestrator stopped");
  }

  /// Insert the initial record and spawn the background analysis task.
  ///
  /// Returns as soon as the record is stored; it never waits on analysis.
  fn submit(&self, job: DumpJob) {
    let report = DumpReport::new(job.machine_name, job.detected_at, job.path);
    let id = report.id();

    self.store.insert(report.clone());
    info!(report_id = %id, file = %report.filename, "Started processing heap dump");

    let store = Arc::clone(&self.store);
    let analyzer = Arc::clone(&self.analyzer);

    // One detached task per dump; unbounded on purpose.
    tokio::spawn(async move {
      let outcome = analyzer.analyze(&report.source_path).await;

      match outcome.status {
        DumpStatus::Completed => info!(
          report_id = %id,
          elapsed_secs = outcome.processing_secs,
          "Successfully processed heap dump"
        ),
        _ => error!(
          report_id = %id,
          error = outcome.error_message.as_deref().unwrap_or("unknown error"),
          "Failed to process heap dump"
        ),
      }

      // Exactly one terminal write-back per task.
      store.update(apply_outcome(report, outcome));
    });
  }
}

/// Merge an analysis outcome into the record's terminal form.
///
/// Identity fields are untouched; only status, artifacts, error, and elapsed
/// time change.
fn apply_outcome(mut report: DumpReport, outcome: AnalysisOutcome) -> DumpReport {
  report.status = outcome.status;
  report.suspects_report = outcome.suspects_report;
  report.overview_report = outcome.overview_report;
  report.error_message = outcome.error_message;
  report.processing_secs = Some(outcome.processing_secs);
  report
}
