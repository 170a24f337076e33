//! Dump analysis via the Auto-MAT container
//!
//! This module invokes the external analyzer once per dump file. The
//! analyzer is a Docker image that receives the dump's directory as a bind
//! mount and writes zero or more HTML report files next to the dump.
//!
//! Invocation never propagates an error to the caller: every failure mode
//! (nonzero exit, spawn failure, timeout) is folded into a terminal
//! [`AnalysisOutcome`] so the background task can always land exactly one
//! write-back on the record store.

use std::{
  path::{Path, PathBuf},
  time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::{debug, error, info};

use crate::domain::report::{ArtifactKind, DumpStatus};

/// Default Auto-MAT image, overridable from the CLI.
pub const DEFAULT_DOCKER_IMAGE: &str = "docker.bintray.io/jfrog/auto-mat";

/// Default JVM memory budget handed to the analyzer.
pub const DEFAULT_MEMORY_BUDGET: &str = "11g";

/// Hard deadline on a single analyzer invocation.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(3600);

// ============================================================================
// Outcome
// ============================================================================

/// Terminal result of one analyzer invocation.
///
/// Always carries a terminal status (`Completed` or `Failed`) and the
/// elapsed wall-clock time; artifacts only on success, an error message only
/// on failure.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
  pub status: DumpStatus,
  pub suspects_report: Option<PathBuf>,
  pub overview_report: Option<PathBuf>,
  pub error_message: Option<String>,
  pub processing_secs: f64,
}

impl AnalysisOutcome {
  pub fn completed(suspects: Option<PathBuf>, overview: Option<PathBuf>, processing_secs: f64) -> Self {
    Self {
      status: DumpStatus::Completed,
      suspects_report: suspects,
      overview_report: overview,
      error_message: None,
      processing_secs,
    }
  }

  pub fn failed(error_message: impl Into<String>, processing_secs: f64) -> Self {
    Self {
      status: DumpStatus::Failed,
      suspects_report: None,
      overview_report: None,
      error_message: Some(error_message.into()),
      processing_secs,
    }
  }
}

// ============================================================================
// Analyzer Trait
// ============================================================================

/// Seam for the external analysis tool.
///
/// The orchestrator only depends on this trait; tests substitute a stub so
/// lifecycle behavior can be exercised without Docker.
#[async_trait]
pub trait DumpAnalyzer: Send + Sync {
  /// Analyze one dump file. Infallible by design: failures become a
  /// `Failed` outcome, never an `Err`.
  async fn analyze(&self, source: &Path) -> AnalysisOutcome;
}

// ============================================================================
// Auto-MAT Analyzer
// ============================================================================

/// Errors internal to a single container invocation.
#[derive(Debug, thiserror::Error)]
enum AnalyzerError {
  #[error("Failed to launch analyzer: {0}")]
  Launch(#[source] std::io::Error),

  #[error("Processing timeout (1 hour exceeded)")]
  Timeout,
}

/// Configuration for [`MatAnalyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
  /// Program used to run the container. Tests point this at a stub binary.
  pub program: String,
  /// Auto-MAT image name.
  pub docker_image: String,
  /// JVM memory budget passed to the analyzer (e.g. `11g`).
  pub memory_budget: String,
  /// Deadline on one invocation.
  pub timeout: Duration,
}

impl Default for AnalyzerConfig {
  fn default() -> Self {
    Self {
      program: "docker".to_string(),
      docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
      memory_budget: DEFAULT_MEMORY_BUDGET.to_string(),
      timeout: DEFAULT_ANALYSIS_TIMEOUT,
    }
  }
}

/// Runs heap dumps through the Auto-MAT Docker image.
#[derive(Debug, Clone)]
pub struct MatAnalyzer {
  config: AnalyzerConfig,
}

impl MatAnalyzer {
  pub fn new(config: AnalyzerConfig) -> Self {
    Self { config }
  }

  /// Run the container to completion, capturing its output.
  async fn run_container(&self, file_dir: &Path, filename: &str) -> Result<std::process::Output, AnalyzerError> {
    let mut cmd = Command::new(&self.config.program);
    cmd
      .arg("run")
      .arg("--rm")
      .arg("--mount")
      .arg(format!("src={},target=/data,type=bind", file_dir.display()))
      .arg(&self.config.docker_image)
      .arg(filename)
      .arg(&self.config.memory_budget)
      .arg("suspects,overview")
      // Reap the container process if the deadline fires first
      .kill_on_drop(true);

    debug!(
      program = %self.config.program,
      image = %self.config.docker_image,
      file = %filename,
      "Running analyzer"
    );

    match timeout(self.config.timeout, cmd.output()).await {
      Ok(output) => output.map_err(AnalyzerError::Launch),
      Err(_) => Err(AnalyzerError::Timeout),
    }
  }
}

#[async_trait]
impl DumpAnalyzer for MatAnalyzer {
  async fn analyze(&self, source: &Path) -> AnalysisOutcome {
    let start = Instant::now();

    let (Some(file_dir), Some(filename)) = (source.parent(), source.file_name().and_then(|n| n.to_str())) else {
      error!(path = %source.display(), "Dump path has no parent directory or filename");
      return AnalysisOutcome::failed(format!("invalid dump path: {}", source.display()), 0.0);
    };

    match self.run_container(file_dir, filename).await {
      Ok(output) if output.status.success() => {
        let suspects = existing_artifact(source, ArtifactKind::Suspects);
        let overview = existing_artifact(source, ArtifactKind::Overview);
        let elapsed = start.elapsed().as_secs_f64();

        info!(
          file = %filename,
          elapsed_secs = elapsed,
          suspects = suspects.is_some(),
          overview = overview.is_some(),
          "Analyzer completed"
        );
        AnalysisOutcome::completed(suspects, overview, elapsed)
      }
      Ok(output) => {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let elapsed = start.elapsed().as_secs_f64();

        error!(
          file = %filename,
          exit_code = output.status.code().unwrap_or(-1),
          stderr = %stderr,
          "Analyzer failed"
        );
        AnalysisOutcome::failed(stderr, elapsed)
      }
      Err(AnalyzerError::Timeout) => {
        error!(file = %filename, timeout_secs = self.config.timeout.as_secs(), "Analyzer timed out");
        AnalysisOutcome::failed(AnalyzerError::Timeout.to_string(), self.config.timeout.as_secs_f64())
      }
      Err(e) => {
        error!(file = %filename, error = %e, "Analyzer invocation error");
        AnalysisOutcome::failed(e.to_string(), start.elapsed().as_secs_f64())
      }
    }
  }
}

// ============================================================================
// Artifact Discovery
// ============================================================================

/// Derived location of an artifact: same directory as the dump, stem plus
/// the kind's suffix. `web01.hprof` -> `web01_Leak_Suspects.html`.
pub fn artifact_path(source: &Path, kind: ArtifactKind) -> PathBuf {
  let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
  let name = format!("{}{}", stem, kind.file_suffix());
  match source.parent() {
    Some(dir) => dir.join(name),
    None => PathBuf::from(name),
  }
}

/// Presence is checked on disk, not parsed from analyzer output.
fn existing_artifact(source: &Path, kind: ArtifactKind) -> Option<PathBuf> {
  let path = artifact_path(source, kind);
  path.exists().then_some(path)
}

// ============================================================================
// Tests
// ============================================================================
