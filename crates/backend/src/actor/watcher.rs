//! WatcherTask - async file watcher that feeds the orchestrator
//!
//! Watches the dump directory for newly created files and turns each one
//! into a [`DumpJob`] for the orchestrator.
//!
//! # Design
//!
//! The watcher bridges notify's sync callbacks with the async pipeline:
//! 1. notify's sync callback uses `blocking_send` to forward events to a channel
//! 2. The async task consumes events, keeping only creations of dump files
//! 3. Each accepted creation spawns a small settle task: sleep the settle
//!    delay, extract the machine name, submit the job
//!
//! The settle sleep is scoped to its one event. It never blocks the watcher
//! loop, other settle tasks, or anything downstream. It is a fixed-delay
//! heuristic against partially written files, not a guarantee: a file still
//! being written after the delay is handed to the analyzer anyway and fails
//! there. Polling the file size until it stabilizes would close that gap
//! but changes observable timing, so the fixed delay stays.
//!
//! # Lifecycle
//!
//! The watcher runs until:
//! - The `CancellationToken` is triggered
//! - The event channel closes (notify watcher dropped)

use std::{
  path::{Path, PathBuf},
  sync::LazyLock,
  time::Duration,
};

use chrono::Local;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{handle::OrchestratorHandle, message::DumpJob};

/// File extensions treated as heap dumps, matched case-insensitively.
pub const DUMP_EXTENSIONS: [&str; 3] = ["hprof", "dump", "bin"];

/// Default settle delay before a created file is treated as ready.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the WatcherTask.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
  /// Directory to watch for new dumps (non-recursive).
  pub watch_dir: PathBuf,
  /// Delay between a create event and the job submission.
  pub settle_delay: Duration,
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur setting up the watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
  #[error("Failed to initialize watcher: {0}")]
  Init(#[source] notify::Error),

  #[error("Failed to watch path: {0}")]
  Watch(#[source] notify::Error),
}

// ============================================================================
// WatcherTask
// ============================================================================

/// Async file watcher that submits dump jobs to the orchestrator.
pub struct WatcherTask {
  config: WatcherConfig,
  orchestrator: OrchestratorHandle,
  cancel: CancellationToken,
  // The notify watcher must be held to keep it alive
  _watcher: RecommendedWatcher,
  // Channel receiving events from notify's sync callback
  event_rx: mpsc::Receiver<Result<Event, notify::Error>>,
}

impl WatcherTask {
  /// Create a new WatcherTask and start watching the configured directory.
  ///
  /// The task itself does nothing until `run()` is called.
  pub fn new(
    config: WatcherConfig,
    orchestrator: OrchestratorHandle,
    cancel: CancellationToken,
  ) -> Result<Self, WatcherError> {
    info!(watch_dir = %config.watch_dir.display(), "Initializing dump watcher");

    // The sync callback uses blocking_send, so give it a reasonable buffer
    let (event_tx, event_rx) = mpsc::channel::<Result<Event, notify::Error>>(256);

    let mut watcher = RecommendedWatcher::new(
      move |res| {
        // This runs on notify's thread - use blocking_send.
        // If the channel is full or closed, we drop the event.
        let _ = event_tx.blocking_send(res);
      },
      Config::default(),
    )
    .map_err(WatcherError::Init)?;

    watcher
      .watch(&config.watch_dir, RecursiveMode::NonRecursive)
      .map_err(WatcherError::Watch)?;

    Ok(Self {
      config,
      orchestrator,
      cancel,
      _watcher: watcher,
      event_rx,
    })
  }

  /// Run the watcher task until cancelled or the event channel closes.
  pub async fn run(mut self) {
    info!(watch_dir = %self.config.watch_dir.display(), "WatcherTask started");

    loop {
      tokio::select! {
        biased;

        _ = self.cancel.cancelled() => {
          info!("WatcherTask shutting down (cancelled)");
          break;
        }

        event = self.event_rx.recv() => {
          match event {
            Some(Ok(event)) => self.process_event(event),
            Some(Err(e)) => warn!(error = %e, "Watcher error"),
            None => {
              info!("WatcherTask shutting down (channel closed)");
              break;
            }
          }
        }
      }
    }

    info!(watch_dir = %self.config.watch_dir.display(), "WatcherTask stopped");
  }

  /// Filter a notify event down to dump-file creations and spawn a settle
  /// task for each accepted path.
  fn process_event(&self, event: Event) {
    if !matches!(event.kind, EventKind::Create(_)) {
      trace!(kind = ?event.kind, "Ignoring non-create event");
      return;
    }

    for path in event.paths {
      if path.is_dir() {
        trace!(path = %path.display(), "Skipping directory event");
        continue;
      }
      if !is_dump_file(&path) {
        trace!(path = %path.display(), "Skipping non-dump file");
        continue;
      }

      debug!(file = %path.display(), "Dump file created");
      self.spawn_settle_task(path);
    }
  }

  /// Sleep out the settle delay for one file, then submit it.
  ///
  /// Intake failures are logged and drop the event; nothing is retried.
  fn spawn_settle_task(&self, path: PathBuf) {
    let orchestrator = self.orchestrator.clone();
    let settle_delay = self.config.settle_delay;

    tokio::spawn(async move {
      tokio::time::sleep(settle_delay).await;

      let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        warn!(path = %path.display(), "Dropping dump with unusable filename");
        return;
      };

      let job = DumpJob {
        machine_name: extract_machine_name(filename),
        detected_at: Local::now(),
        path,
      };

      if let Err(e) = orchestrator.submit(job).await {
        warn!(error = %e, "Failed to submit dump job");
      }
    });
  }
}

// ============================================================================
// Intake Filters
// ============================================================================

/// True if the path carries one of the configured dump extensions.
pub fn is_dump_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| DUMP_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Ordered machine-name patterns, first match wins.
static MACHINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  [
    r"^([^_]+)_.*",   // machine_timestamp
    r".*_([^_]+)_.*", // prefix_machine_suffix
    r"^([^.]+)\..*",  // filename without extension
  ]
  .iter()
  .map(|pattern| Regex::new(pattern).expect("static machine-name pattern"))
  .collect()
});

/// Extract a machine name from a dump filename.
///
/// Total over all filenames: the pattern cascade falls back to the file
/// stem, so a non-empty input always yields a value.
pub fn extract_machine_name(filename: &str) -> String {
  for pattern in MACHINE_PATTERNS.iter() {
    if let Some(captures) = pattern.captures(filename)
      && let Some(name) = captures.get(1)
    {
      return name.as_str().to_string();
    }
  }

  // Fallback: filename without its extension
  Path::new(filename)
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| filename.to_string())
}
