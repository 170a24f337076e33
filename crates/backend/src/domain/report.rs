//! Report types for tracked heap dumps
//!
//! A [`DumpReport`] is created the moment a dump file is handed to the
//! orchestrator and is mutated exactly once afterwards, when its background
//! analysis task lands a terminal status. Identity fields (`machine_name`,
//! `detected_at`, `filename`, `source_path`) never change after creation.

use std::{
  fmt,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ============================================================================
// Report Identity
// ============================================================================

/// Stable identifier for a tracked dump.
///
/// Derived from `(machine_name, detected_at)` at second resolution:
/// `{machine}_{YYYYMMDD}_{HHMMSS}`. Two dumps from the same machine detected
/// within the same second therefore collide, and the later insert overwrites
/// the earlier record. That is intentional source behavior, not a bug to fix
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(String);

impl ReportId {
  /// Derive the id for a machine name and detection time.
  pub fn derive(machine_name: &str, detected_at: &DateTime<Local>) -> Self {
    Self(format!("{}_{}", machine_name, detected_at.format("%Y%m%d_%H%M%S")))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ReportId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for ReportId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl From<&str> for ReportId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

// ============================================================================
// Status & Artifacts
// ============================================================================

/// Lifecycle status of a tracked dump.
///
/// A report is created as `Processing` and transitions exactly once, to
/// either `Completed` or `Failed`. Terminal reports never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpStatus {
  Processing,
  Completed,
  Failed,
}

impl DumpStatus {
  /// Returns true for `Completed` and `Failed`.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Processing => "processing",
      Self::Completed => "completed",
      Self::Failed => "failed",
    }
  }
}

/// The report artifacts the analyzer can produce for a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
  Suspects,
  Overview,
}

impl ArtifactKind {
  /// Filename suffix appended to the dump's stem by the analyzer.
  pub fn file_suffix(&self) -> &'static str {
    match self {
      Self::Suspects => "_Leak_Suspects.html",
      Self::Overview => "_System_Overview.html",
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Suspects => "suspects",
      Self::Overview => "overview",
    }
  }
}

// ============================================================================
// DumpReport
// ============================================================================

/// Tracked lifecycle state for one detected heap dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpReport {
  pub machine_name: String,
  pub detected_at: DateTime<Local>,
  pub filename: String,
  pub source_path: PathBuf,
  pub status: DumpStatus,
  pub suspects_report: Option<PathBuf>,
  pub overview_report: Option<PathBuf>,
  pub error_message: Option<String>,
  pub processing_secs: Option<f64>,
}

impl DumpReport {
  /// Create a new report in the `Processing` state.
  ///
  /// The filename is taken from the source path; a path with no final
  /// component yields an empty filename, which intake filtering prevents
  /// in practice.
  pub fn new(machine_name: impl Into<String>, detected_at: DateTime<Local>, source_path: PathBuf) -> Self {
    let filename = source_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    Self {
      machine_name: machine_name.into(),
      detected_at,
      filename,
      source_path,
      status: DumpStatus::Processing,
      suspects_report: None,
      overview_report: None,
      error_message: None,
      processing_secs: None,
    }
  }

  /// The derived identity of this report.
  pub fn id(&self) -> ReportId {
    ReportId::derive(&self.machine_name, &self.detected_at)
  }

  /// Location of the given artifact, if the analyzer produced it.
  pub fn artifact_path(&self, kind: ArtifactKind) -> Option<&Path> {
    match kind {
      ArtifactKind::Suspects => self.suspects_report.as_deref(),
      ArtifactKind::Overview => self.overview_report.as_deref(),
    }
  }
}
