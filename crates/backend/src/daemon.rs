//! Daemon lifecycle management
//!
//! The daemon is the main entry point for the heapwatch background process.
//! It wires the pipeline together and supervises shutdown.
//!
//! # Architecture
//!
//! ```text
//! Daemon (supervisor)
//!   ├── WatcherTask (filesystem notifications -> DumpJobs)
//!   ├── Orchestrator (DumpJobs -> records + analysis tasks)
//!   │     └── analysis task per dump (detached, never cancelled)
//!   └── Server (HTTP queries over the shared ReportStore)
//! ```
//!
//! # Lifecycle
//!
//! 1. Create the watch directory if missing
//! 2. Create master `CancellationToken`, store, and analyzer
//! 3. Spawn orchestrator and watcher with child tokens
//! 4. Run the HTTP server in the foreground until ctrl-c
//! 5. Cancel children and join the watcher and orchestrator loops
//!
//! In-flight analysis tasks are deliberately not joined on shutdown; the
//! daemon stops accepting work and exits.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
  actor::{DEFAULT_SETTLE_DELAY, Orchestrator, WatcherConfig, WatcherTask},
  analyzer::{AnalyzerConfig, DEFAULT_ANALYSIS_TIMEOUT, DEFAULT_DOCKER_IMAGE, DEFAULT_MEMORY_BUDGET, MatAnalyzer},
  server::{Server, ServerConfig},
  store::ReportStore,
};

// ============================================================================
// Configuration
// ============================================================================

/// Daemon runtime configuration, usually built from CLI flags.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Directory monitored for new heap dumps.
  pub watch_dir: PathBuf,
  /// HTTP bind host.
  pub host: String,
  /// HTTP bind port.
  pub port: u16,
  /// Auto-MAT Docker image.
  pub docker_image: String,
  /// JVM memory budget handed to the analyzer.
  pub memory_budget: String,
  /// Delay between file creation and processing.
  pub settle_delay: Duration,
  /// Deadline on one analyzer invocation.
  pub analysis_timeout: Duration,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      watch_dir: PathBuf::from("/dump"),
      host: "0.0.0.0".to_string(),
      port: 5000,
      docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
      memory_budget: DEFAULT_MEMORY_BUDGET.to_string(),
      settle_delay: DEFAULT_SETTLE_DELAY,
      analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
    }
  }
}

// ============================================================================
// Daemon
// ============================================================================

/// The heapwatch daemon - wires the watcher, orchestrator, and HTTP server
/// around one shared [`ReportStore`].
pub struct Daemon {
  config: RuntimeConfig,
}

impl Daemon {
  pub fn new(config: RuntimeConfig) -> Self {
    Self { config }
  }

  /// Run the daemon, blocking until shutdown.
  pub async fn run(self) {
    info!("Starting heapwatch daemon");
    info!(watch_dir = %self.config.watch_dir.display(), "Watch directory");
    info!(addr = %format!("http://{}:{}", self.config.host, self.config.port), "Web server");

    if let Err(e) = tokio::fs::create_dir_all(&self.config.watch_dir).await {
      error!(dir = %self.config.watch_dir.display(), error = %e, "Failed to create watch directory");
      return;
    }

    // Master cancellation token - propagates to all children
    let cancel = CancellationToken::new();

    let store = Arc::new(ReportStore::new());
    let analyzer = Arc::new(MatAnalyzer::new(AnalyzerConfig {
      docker_image: self.config.docker_image.clone(),
      memory_budget: self.config.memory_budget.clone(),
      timeout: self.config.analysis_timeout,
      ..AnalyzerConfig::default()
    }));

    let (orchestrator, orchestrator_handle) = Orchestrator::new(Arc::clone(&store), analyzer, cancel.child_token());
    let orchestrator_task = tokio::spawn(orchestrator.run());

    let watcher_config = WatcherConfig {
      watch_dir: self.config.watch_dir.clone(),
      settle_delay: self.config.settle_delay,
    };
    let watcher = match WatcherTask::new(watcher_config, orchestrator_handle, cancel.child_token()) {
      Ok(watcher) => watcher,
      Err(e) => {
        error!(error = %e, "Failed to start file watcher");
        cancel.cancel();
        return;
      }
    };
    let watcher_task = tokio::spawn(watcher.run());
    info!(watch_dir = %self.config.watch_dir.display(), "File monitoring started");

    // Handle ctrl-c gracefully
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        return;
      }
      info!("Received ctrl-c, shutting down...");
      cancel_for_signal.cancel();
    });

    let server = Server::new(
      ServerConfig {
        host: self.config.host.clone(),
        port: self.config.port,
      },
      Arc::clone(&store),
    );
    if let Err(e) = server.run(cancel.child_token()).await {
      warn!(error = %e, "Server error");
    }

    info!("Shutting down...");
    cancel.cancel();

    let _ = futures::future::join_all([watcher_task, orchestrator_task]).await;
    // In-flight analysis tasks are not joined; see module docs.

    info!("Shutdown complete");
  }
}
