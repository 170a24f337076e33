//! heapwatch CLI - heap dump monitor and analysis web server

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use heapwatch::{Daemon, RuntimeConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "heapwatch")]
#[command(about = "Monitors a directory for heap dumps, analyzes them with Auto-MAT, and serves the reports")]
struct Cli {
  /// Directory to monitor for heap dumps
  #[arg(long, default_value = "/dump")]
  watch_dir: PathBuf,

  /// Web server host
  #[arg(long, default_value = "0.0.0.0")]
  host: String,

  /// Web server port
  #[arg(long, default_value_t = 5000)]
  port: u16,

  /// Auto-MAT Docker image
  #[arg(long, default_value = "docker.bintray.io/jfrog/auto-mat")]
  docker_image: String,

  /// Memory budget handed to the analyzer JVM
  #[arg(long, default_value = "11g")]
  memory_budget: String,

  /// Seconds to wait after a file appears before processing it
  #[arg(long, default_value_t = 2)]
  settle_secs: u64,
}

/// Log to the console and to `heapwatch.log` in the working directory.
///
/// The returned guard must be kept alive for the duration of the program so
/// buffered file output is flushed on exit.
fn init_logging() -> WorkerGuard {
  let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

  let file_appender = tracing_appender::rolling::never(".", "heapwatch.log");
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_ansi(true))
    .with(fmt::layer().with_ansi(false).with_writer(file_writer))
    .init();

  guard
}

#[tokio::main]
async fn main() -> Result<()> {
  let _guard = init_logging();

  let cli = Cli::parse();
  let config = RuntimeConfig {
    watch_dir: cli.watch_dir,
    host: cli.host,
    port: cli.port,
    docker_image: cli.docker_image,
    memory_budget: cli.memory_budget,
    settle_delay: Duration::from_secs(cli.settle_secs),
    ..RuntimeConfig::default()
  };

  Daemon::new(config).run().await;
  Ok(())
}
