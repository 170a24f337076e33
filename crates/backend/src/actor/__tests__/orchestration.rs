#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc, time::Duration};

  use tokio_util::sync::CancellationToken;

  use crate::{
    actor::{Orchestrator, __tests__::helpers::*, handle::OrchestratorHandle},
    analyzer::{AnalysisOutcome, DumpAnalyzer},
    domain::report::{DumpStatus, ReportId},
    store::ReportStore,
  };

  fn spawn_orchestrator(
    store: &Arc<ReportStore>,
    analyzer: Arc<dyn DumpAnalyzer>,
  ) -> (OrchestratorHandle, CancellationToken) {
    let cancel = CancellationToken::new();
    let (orchestrator, handle) = Orchestrator::new(Arc::clone(store), analyzer, cancel.clone());
    tokio::spawn(orchestrator.run());
    (handle, cancel)
  }

  #[tokio::test]
  async fn test_completed_lifecycle() {
    let store = Arc::new(ReportStore::new());
    let analyzer = StubAnalyzer::with_delay(
      AnalysisOutcome::completed(
        Some(PathBuf::from("/dump/web01_1_Leak_Suspects.html")),
        Some(PathBuf::from("/dump/web01_1_System_Overview.html")),
        3.2,
      ),
      Duration::from_millis(200),
    );
    let (handle, cancel) = spawn_orchestrator(&store, analyzer);

    handle.submit(job("web01", "/dump/web01_1.hprof")).await.unwrap();

    // The record appears as Processing before the analysis finishes.
    let id = ReportId::derive("web01", &detection_time());
    let initial = wait_for_report(&store, &id, Duration::from_millis(100)).await;
    assert_eq!(initial.status, DumpStatus::Processing);
    assert!(initial.suspects_report.is_none());
    assert!(initial.error_message.is_none());

    let terminal = wait_for_terminal(&store, &id, Duration::from_secs(2)).await;
    assert_eq!(terminal.status, DumpStatus::Completed);
    assert!(terminal.suspects_report.is_some());
    assert!(terminal.overview_report.is_some());
    assert!(terminal.error_message.is_none());
    assert_eq!(terminal.processing_secs, Some(3.2));

    // Identity is unchanged across the transition.
    assert_eq!(terminal.machine_name, initial.machine_name);
    assert_eq!(terminal.detected_at, initial.detected_at);
    assert_eq!(terminal.filename, initial.filename);

    cancel.cancel();
  }

  #[tokio::test]
  async fn test_failed_lifecycle() {
    let store = Arc::new(ReportStore::new());
    let analyzer = StubAnalyzer::new(AnalysisOutcome::failed("container exited with status 137", 9.9));
    let (handle, cancel) = spawn_orchestrator(&store, analyzer);

    handle.submit(job("web02", "/dump/web02_1.hprof")).await.unwrap();

    let id = ReportId::derive("web02", &detection_time());
    let terminal = wait_for_terminal(&store, &id, Duration::from_secs(2)).await;
    assert_eq!(terminal.status, DumpStatus::Failed);
    assert_eq!(terminal.error_message.as_deref(), Some("container exited with status 137"));
    assert!(terminal.suspects_report.is_none());
    assert!(terminal.overview_report.is_none());
    assert_eq!(terminal.processing_secs, Some(9.9));

    cancel.cancel();
  }

  #[tokio::test]
  async fn test_timeout_outcome_shape() {
    let store = Arc::new(ReportStore::new());
    let analyzer = StubAnalyzer::new(AnalysisOutcome::failed("Processing timeout (1 hour exceeded)", 3600.0));
    let (handle, cancel) = spawn_orchestrator(&store, analyzer);

    handle.submit(job("web03", "/dump/web03_1.hprof")).await.unwrap();

    let id = ReportId::derive("web03", &detection_time());
    let terminal = wait_for_terminal(&store, &id, Duration::from_secs(2)).await;
    assert_eq!(terminal.status, DumpStatus::Failed);
    assert!(terminal.error_message.unwrap().contains("timeout"));
    assert_eq!(terminal.processing_secs, Some(3600.0));

    cancel.cancel();
  }

  #[tokio::test]
  async fn test_same_second_collision_keeps_one_record() {
    let store = Arc::new(ReportStore::new());
    let analyzer = StubAnalyzer::new(AnalysisOutcome::completed(None, None, 0.1));
    let (handle, cancel) = spawn_orchestrator(&store, analyzer);

    // Same machine, same detection second, different files.
    handle.submit(job("web01", "/dump/web01_first.hprof")).await.unwrap();
    handle.submit(job("web01", "/dump/web01_second.hprof")).await.unwrap();

    let id = ReportId::derive("web01", &detection_time());
    wait_for_terminal(&store, &id, Duration::from_secs(2)).await;

    // Both jobs resolved onto the single surviving record.
    assert_eq!(store.len(), 1);

    cancel.cancel();
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_analysis_tasks_run_in_parallel() {
    const JOBS: usize = 6;
    let per_job_delay = Duration::from_millis(300);

    let store = Arc::new(ReportStore::new());
    let analyzer = StubAnalyzer::with_delay(AnalysisOutcome::completed(None, None, 0.3), per_job_delay);
    let (handle, cancel) = spawn_orchestrator(&store, analyzer);

    let start = tokio::time::Instant::now();
    for i in 0..JOBS {
      let machine = format!("web{i:02}");
      handle.submit(job(&machine, &format!("/dump/{machine}.hprof"))).await.unwrap();
    }

    for i in 0..JOBS {
      let id = ReportId::derive(&format!("web{i:02}"), &detection_time());
      wait_for_terminal(&store, &id, Duration::from_secs(2)).await;
    }

    // Six 300ms analyses done far faster than they would run serially.
    assert!(
      start.elapsed() < per_job_delay * JOBS as u32,
      "analysis tasks appear to have run serially ({:?})",
      start.elapsed()
    );

    cancel.cancel();
  }

  #[tokio::test]
  async fn test_submit_does_not_wait_on_analysis() {
    let store = Arc::new(ReportStore::new());
    // An analysis that never finishes within the test.
    let analyzer = StubAnalyzer::with_delay(AnalysisOutcome::completed(None, None, 0.0), Duration::from_secs(60));
    let (handle, cancel) = spawn_orchestrator(&store, analyzer);

    handle.submit(job("web01", "/dump/web01_1.hprof")).await.unwrap();

    let id = ReportId::derive("web01", &detection_time());
    let report = wait_for_report(&store, &id, Duration::from_millis(500)).await;
    assert_eq!(report.status, DumpStatus::Processing);

    cancel.cancel();
  }
}
