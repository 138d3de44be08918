//! Logging setup for the intake binary.

use std::path::Path;

use anyhow::Context;
use intake_core::DaemonConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Parse log level from config string
fn parse_log_level(level: &str) -> tracing::Level {
  match level.to_lowercase().as_str() {
    "off" | "error" => tracing::Level::ERROR,
    "warn" => tracing::Level::WARN,
    "info" => tracing::Level::INFO,
    "debug" => tracing::Level::DEBUG,
    "trace" => tracing::Level::TRACE,
    _ => tracing::Level::INFO,
  }
}

/// Initialize the tracing subscriber.
///
/// Without a log directory: console output with colors. With one: a rolling
/// file per the configured rotation, no ANSI. The returned guard must stay
/// alive for the program's lifetime so the non-blocking writer flushes on
/// shutdown.
pub fn init(config: &DaemonConfig, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
  let level = parse_log_level(&config.log_level);
  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  match log_dir {
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(true)
        .init();
      Ok(None)
    }
    Some(dir) => {
      std::fs::create_dir_all(dir).with_context(|| format!("Cannot create log directory {}", dir.display()))?;

      let appender = match config.log_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(dir, "intake.log"),
        "never" => tracing_appender::rolling::never(dir, "intake.log"),
        _ => tracing_appender::rolling::daily(dir, "intake.log"),
      };
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .init();
      Ok(Some(guard))
    }
  }
}
