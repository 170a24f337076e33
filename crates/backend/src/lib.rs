mod actor;
mod server;

mod analyzer;
pub use analyzer::{AnalysisOutcome, AnalyzerConfig, DumpAnalyzer, MatAnalyzer};

mod store;
pub use store::{ReportStore, StatusSummary};

mod domain;
pub use domain::report;

mod daemon;
pub use daemon::{Daemon, RuntimeConfig};
