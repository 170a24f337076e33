#[cfg(test)]
mod tests {
  use std::{fs, time::Duration};

  use tokio::{
    sync::mpsc,
    time::{sleep, timeout},
  };
  use tokio_util::sync::CancellationToken;

  use crate::actor::{
    WatcherConfig, WatcherTask,
    handle::OrchestratorHandle,
    message::DumpJob,
  };

  #[tokio::test]
  async fn test_watcher_emits_jobs_for_dump_files() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    // Capture jobs directly instead of running a real orchestrator.
    let (tx, mut rx) = mpsc::channel::<DumpJob>(16);
    let handle = OrchestratorHandle::new(tx);
    let cancel = CancellationToken::new();

    let config = WatcherConfig {
      watch_dir: temp_dir.path().to_path_buf(),
      settle_delay: Duration::from_millis(50),
    };
    let watcher = WatcherTask::new(config, handle, cancel.clone()).expect("create watcher");
    let watcher_task = tokio::spawn(watcher.run());

    // Give the watcher time to initialize.
    sleep(Duration::from_millis(100)).await;

    // A dump file produces a job with the extracted machine name.
    let dump = temp_dir.path().join("web01_20240301.hprof");
    fs::write(&dump, b"heap dump bytes").expect("write dump");

    let job = timeout(Duration::from_secs(3), rx.recv())
      .await
      .expect("timeout waiting for dump job")
      .expect("receive dump job");

    assert_eq!(job.path, dump);
    assert_eq!(job.machine_name, "web01");

    // A non-dump file is filtered out entirely.
    fs::write(temp_dir.path().join("notes.txt"), b"not a dump").expect("write file");
    let silence = timeout(Duration::from_millis(400), rx.recv()).await;
    assert!(silence.is_err(), "expected no job for non-dump file, got {silence:?}");

    // Cancellation stops the task.
    cancel.cancel();
    timeout(Duration::from_secs(2), watcher_task)
      .await
      .expect("watcher did not stop after cancel")
      .expect("watcher task panicked");
  }

  #[tokio::test]
  async fn test_watcher_settle_delay_precedes_submission() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    let (tx, mut rx) = mpsc::channel::<DumpJob>(16);
    let handle = OrchestratorHandle::new(tx);
    let cancel = CancellationToken::new();

    let config = WatcherConfig {
      watch_dir: temp_dir.path().to_path_buf(),
      settle_delay: Duration::from_millis(300),
    };
    let watcher = WatcherTask::new(config, handle, cancel.clone()).expect("create watcher");
    tokio::spawn(watcher.run());

    sleep(Duration::from_millis(100)).await;

    let started = tokio::time::Instant::now();
    fs::write(temp_dir.path().join("db01.dump"), b"heap dump bytes").expect("write dump");

    let job = timeout(Duration::from_secs(3), rx.recv())
      .await
      .expect("timeout waiting for dump job")
      .expect("receive dump job");

    assert_eq!(job.machine_name, "db01");
    assert!(
      started.elapsed() >= Duration::from_millis(300),
      "job arrived before the settle delay elapsed"
    );

    cancel.cancel();
  }
}
