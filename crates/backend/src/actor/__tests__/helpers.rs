//! Test helpers for pipeline integration tests.
//!
//! Provides a stub analyzer so lifecycle behavior can be exercised without
//! Docker, plus polling helpers for waiting on terminal states.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use crate::{
  actor::message::DumpJob,
  analyzer::{AnalysisOutcome, DumpAnalyzer},
  domain::report::{DumpReport, ReportId},
  store::ReportStore,
};

/// Analyzer stub returning a preset outcome after an optional delay.
///
/// The delay stands in for the up-to-an-hour container run and lets tests
/// observe the `Processing` window and task parallelism.
pub struct StubAnalyzer {
  pub outcome: AnalysisOutcome,
  pub delay: Duration,
}

impl StubAnalyzer {
  pub fn new(outcome: AnalysisOutcome) -> Arc<Self> {
    Arc::new(Self {
      outcome,
      delay: Duration::ZERO,
    })
  }

  pub fn with_delay(outcome: AnalysisOutcome, delay: Duration) -> Arc<Self> {
    Arc::new(Self { outcome, delay })
  }
}

#[async_trait]
impl DumpAnalyzer for StubAnalyzer {
  async fn analyze(&self, _source: &Path) -> AnalysisOutcome {
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.outcome.clone()
  }
}

/// Fixed detection time shared by collision tests.
pub fn detection_time() -> DateTime<Local> {
  Local.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn job(machine: &str, path: &str) -> DumpJob {
  DumpJob {
    path: PathBuf::from(path),
    machine_name: machine.to_string(),
    detected_at: detection_time(),
  }
}

/// Poll the store until the report at `id` exists, up to `deadline`.
pub async fn wait_for_report(store: &ReportStore, id: &ReportId, deadline: Duration) -> DumpReport {
  let start = tokio::time::Instant::now();
  loop {
    if let Some(report) = store.get(id) {
      return report;
    }
    assert!(start.elapsed() < deadline, "report {id} never appeared");
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
}

/// Poll the store until the report at `id` reaches a terminal state.
pub async fn wait_for_terminal(store: &ReportStore, id: &ReportId, deadline: Duration) -> DumpReport {
  let start = tokio::time::Instant::now();
  loop {
    if let Some(report) = store.get(id)
      && report.status.is_terminal()
    {
      return report;
    }
    assert!(start.elapsed() < deadline, "report {id} never reached a terminal state");
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
}
