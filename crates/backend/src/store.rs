//! ReportStore - concurrent map of report id to report
//!
//! The store is the only shared mutable state in the daemon. It is written
//! by the orchestrator (initial insert) and by each background analysis task
//! (terminal update), and read by HTTP request handlers, all concurrently.
//!
//! # Design
//!
//! - `DashMap` instead of `RwLock<HashMap<...>>`: entries are replaced
//!   atomically under a shard lock, so readers never observe a half-written
//!   report.
//! - All read accessors return owned clones. A snapshot is independent of
//!   any mutation that happens after it was taken.
//! - No I/O happens while a shard lock is held; callers are blocked only for
//!   the duration of an entry clone or replace.
//! - The store is an owned, injectable object - tests instantiate their own.
//!
//! Records are never removed; the map grows for the lifetime of the process.

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::report::{DumpReport, DumpStatus, ReportId};

// ============================================================================
// Status Summary
// ============================================================================

/// Aggregate report counts, computed in a single pass over the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusSummary {
  pub total: usize,
  pub processing: usize,
  pub completed: usize,
  pub failed: usize,
}

// ============================================================================
// ReportStore
// ============================================================================

/// Concurrent store of dump reports, keyed by [`ReportId`].
#[derive(Debug, Default)]
pub struct ReportStore {
  reports: DashMap<ReportId, DumpReport>,
}

impl ReportStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a report under its derived id, overwriting any existing entry.
  ///
  /// Same-second duplicates from one machine collide on the derived id;
  /// the last insert wins.
  pub fn insert(&self, report: DumpReport) {
    let id = report.id();
    if self.reports.insert(id.clone(), report).is_some() {
      warn!(report_id = %id, "Report id collision, previous record overwritten");
    }
  }

  /// Replace the report at its id, only if an entry already exists.
  ///
  /// An update for an unknown id is dropped with a warning. Given the call
  /// discipline (every background task updates the id it was spawned for)
  /// this should not happen, but it must not crash if it does.
  pub fn update(&self, report: DumpReport) {
    let id = report.id();
    match self.reports.get_mut(&id) {
      Some(mut entry) => *entry = report,
      None => warn!(report_id = %id, "Dropping update for unknown report id"),
    }
  }

  /// Snapshot of every stored report, in no guaranteed order.
  pub fn get_all(&self) -> Vec<DumpReport> {
    self.reports.iter().map(|entry| entry.value().clone()).collect()
  }

  /// Snapshot of all reports for a machine, exact string match.
  pub fn get_by_machine(&self, machine_name: &str) -> Vec<DumpReport> {
    self
      .reports
      .iter()
      .filter(|entry| entry.value().machine_name == machine_name)
      .map(|entry| entry.value().clone())
      .collect()
  }

  /// Snapshot of all reports detected on a calendar date (`YYYY-MM-DD`,
  /// local time). Unparsable input yields an empty list, not an error.
  pub fn get_by_date(&self, date_str: &str) -> Vec<DumpReport> {
    let Ok(target) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
      debug!(date = %date_str, "Unparsable date in report query");
      return Vec::new();
    };

    self
      .reports
      .iter()
      .filter(|entry| entry.value().detected_at.date_naive() == target)
      .map(|entry| entry.value().clone())
      .collect()
  }

  /// Single report lookup by id.
  pub fn get(&self, id: &ReportId) -> Option<DumpReport> {
    self.reports.get(id).map(|entry| entry.value().clone())
  }

  /// Count reports by status in one pass.
  ///
  /// Each record is visited exactly once, so the per-status counts always
  /// sum to `total` even while the store is being mutated concurrently.
  pub fn status_summary(&self) -> StatusSummary {
    self.reports.iter().fold(StatusSummary::default(), |mut acc, entry| {
      acc.total += 1;
      match entry.value().status {
        DumpStatus::Processing => acc.processing += 1,
        DumpStatus::Completed => acc.completed += 1,
        DumpStatus::Failed => acc.failed += 1,
      }
      acc
    })
  }

  pub fn len(&self) -> usize {
    self.reports.len()
  }

  pub fn is_empty(&self) -> bool {
    self.reports.is_empty()
  }
}

// ============================================================================
// Tests
// ============================================================================
