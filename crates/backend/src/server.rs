//! HTTP query surface over the report store
//!
//! A thin adapter: every route is a read against [`ReportStore`] snapshots,
//! so handlers never hold anything across an await that writers could block
//! on. Query problems (bad dates, unknown ids, missing artifact files) come
//! back as empty lists or 404s, never as server faults.
//!
//! # Routes
//!
//! - `GET /` - HTML table of all reports, newest first
//! - `GET /api/reports` - all reports as JSON
//! - `GET /api/reports/machine/:machine` - reports for one machine
//! - `GET /api/reports/date/:date` - reports detected on `YYYY-MM-DD`
//! - `GET /api/reports/:id/suspects` - leak-suspects HTML artifact
//! - `GET /api/reports/:id/overview` - system-overview HTML artifact
//! - `GET /api/status` - aggregate counts

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{Path, State},
  http::StatusCode,
  response::{Html, IntoResponse, Response},
  routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
  domain::report::{ArtifactKind, DumpReport, ReportId},
  store::{ReportStore, StatusSummary},
};

// ============================================================================
// Server
// ============================================================================

/// Errors that can occur running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
  #[error("Failed to bind {addr}: {source}")]
  Bind {
    addr: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Server error: {0}")]
  Serve(#[source] std::io::Error),
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
}

/// HTTP server exposing the report store.
pub struct Server {
  config: ServerConfig,
  store: Arc<ReportStore>,
}

impl Server {
  pub fn new(config: ServerConfig, store: Arc<ReportStore>) -> Self {
    Self { config, store }
  }

  /// Serve requests until the cancellation token is triggered.
  pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
    let addr = format!("{}:{}", self.config.host, self.config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|source| ServerError::Bind {
      addr: addr.clone(),
      source,
    })?;

    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, router(self.store))
      .with_graceful_shutdown(async move { cancel.cancelled().await })
      .await
      .map_err(ServerError::Serve)?;

    info!("HTTP server stopped");
    Ok(())
  }
}

fn router(store: Arc<ReportStore>) -> Router {
  Router::new()
    .route("/", get(index_page))
    .route("/api/reports", get(all_reports))
    .route("/api/reports/machine/:machine", get(reports_by_machine))
    .route("/api/reports/date/:date", get(reports_by_date))
    .route("/api/reports/:id/suspects", get(suspects_artifact))
    .route("/api/reports/:id/overview", get(overview_artifact))
    .route("/api/status", get(service_status))
    .with_state(store)
}

// ============================================================================
// Handlers
// ============================================================================

async fn all_reports(State(store): State<Arc<ReportStore>>) -> Json<Vec<DumpReport>> {
  Json(store.get_all())
}

async fn reports_by_machine(
  State(store): State<Arc<ReportStore>>,
  Path(machine): Path<String>,
) -> Json<Vec<DumpReport>> {
  Json(store.get_by_machine(&machine))
}

async fn reports_by_date(State(store): State<Arc<ReportStore>>, Path(date): Path<String>) -> Json<Vec<DumpReport>> {
  Json(store.get_by_date(&date))
}

async fn suspects_artifact(State(store): State<Arc<ReportStore>>, Path(id): Path<String>) -> Response {
  serve_artifact(&store, &id, ArtifactKind::Suspects).await
}

async fn overview_artifact(State(store): State<Arc<ReportStore>>, Path(id): Path<String>) -> Response {
  serve_artifact(&store, &id, ArtifactKind::Overview).await
}

/// Service status payload for `/api/status`.
#[derive(Debug, Serialize)]
struct ServiceStatus {
  status: &'static str,
  #[serde(flatten)]
  summary: StatusSummary,
}

async fn service_status(State(store): State<Arc<ReportStore>>) -> Json<ServiceStatus> {
  Json(ServiceStatus {
    status: "running",
    summary: store.status_summary(),
  })
}

/// Serve an artifact's file content, or a JSON 404 if the record, the
/// artifact reference, or the file itself is missing.
async fn serve_artifact(store: &ReportStore, id: &str, kind: ArtifactKind) -> Response {
  let not_found = || {
    (
      StatusCode::NOT_FOUND,
      Json(serde_json::json!({ "error": format!("{} report not found", kind.as_str()) })),
    )
      .into_response()
  };

  let Some(report) = store.get(&ReportId::from(id)) else {
    debug!(report_id = %id, "Artifact requested for unknown report");
    return not_found();
  };
  let Some(path) = report.artifact_path(kind) else {
    return not_found();
  };

  match tokio::fs::read_to_string(path).await {
    Ok(body) => Html(body).into_response(),
    Err(e) => {
      debug!(report_id = %id, error = %e, "Artifact file missing on disk");
      not_found()
    }
  }
}

async fn index_page(State(store): State<Arc<ReportStore>>) -> Html<String> {
  let mut reports = store.get_all();
  reports.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
  Html(render_index(&reports))
}

// ============================================================================
// HTML Rendering
// ============================================================================

fn render_index(reports: &[DumpReport]) -> String {
  let mut rows = String::new();
  for report in reports {
    let id = report.id();
    let mut links = String::new();
    if report.suspects_report.is_some() {
      links.push_str(&format!(
        r#"<a href="/api/reports/{id}/suspects" target="_blank">Suspects</a> "#
      ));
    }
    if report.overview_report.is_some() {
      links.push_str(&format!(
        r#"<a href="/api/reports/{id}/overview" target="_blank">Overview</a>"#
      ));
    }
    if let Some(error) = &report.error_message {
      links.push_str(&format!(r#"<span class="error-message">{}</span>"#, escape_html(error)));
    }

    let processing_time = report
      .processing_secs
      .map(|secs| format!("{secs:.2}s"))
      .unwrap_or_else(|| "N/A".to_string());

    rows.push_str(&format!(
      "<tr>\
       <td>{machine}</td>\
       <td>{timestamp}</td>\
       <td>{filename}</td>\
       <td class=\"status-{status}\">{status}</td>\
       <td>{processing_time}</td>\
       <td class=\"reports-links\">{links}</td>\
       </tr>\n",
      machine = escape_html(&report.machine_name),
      timestamp = report.detected_at.format("%Y-%m-%d %H:%M:%S"),
      filename = escape_html(&report.filename),
      status = report.status.as_str(),
    ));
  }

  format!(
    "<!DOCTYPE html>\n\
     <html>\n\
     <head>\n\
     <meta charset=\"utf-8\">\n\
     <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
     <title>Heap Dump Reports</title>\n\
     </head>\n\
     <body>\n\
     <h1>Heap Dump Analysis Reports</h1>\n\
     <table>\n\
     <tr><th>Machine</th><th>Timestamp</th><th>Filename</th>\
     <th>Status</th><th>Processing Time</th><th>Reports</th></tr>\n\
     {rows}\
     </table>\n\
     </body>\n\
     </html>\n"
  )
}

fn escape_html(text: &str) -> String {
  text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

// ============================================================================
// Tests
// ============================================================================
