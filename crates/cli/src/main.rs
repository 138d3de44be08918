//! intake — watch a directory and report files that have finished arriving.

mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use intake::{Pipeline, PipelineOptions};
use intake_core::Config;
use tracing::info;

#[derive(Parser)]
#[command(
  name = "intake",
  version,
  about = "Watches a directory and reports files that have finished being written"
)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Watch a directory and print each file as it becomes ready
  Run {
    /// Directory to watch, recursively
    root: PathBuf,

    /// Explicit config file (default: ~/.config/intake/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the completion worker count
    #[arg(long)]
    workers: Option<usize>,

    /// Write logs to a rolling file in this directory instead of the console
    #[arg(long)]
    log_dir: Option<PathBuf>,
  },
  /// Print the effective configuration as TOML
  Config {
    /// Explicit config file (default: ~/.config/intake/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  match cli.command {
    Command::Run {
      root,
      config,
      workers,
      log_dir,
    } => run(root, config, workers, log_dir).await,
    Command::Config { config } => print_config(config),
  }
}

async fn run(
  root: PathBuf,
  config_path: Option<PathBuf>,
  workers: Option<usize>,
  log_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
  let mut config = Config::resolve(config_path.as_deref())?;
  if let Some(workers) = workers {
    config.completion.workers = workers;
  }
  let _guard = logging::init(&config.daemon, log_dir.as_deref())?;

  let root = root
    .canonicalize()
    .with_context(|| format!("Cannot watch {}", root.display()))?;
  anyhow::ensure!(root.is_dir(), "Watch root {} is not a directory", root.display());

  let pipeline = Pipeline::start(PipelineOptions::from_config(&root, &config))?;
  info!(
    root = %root.display(),
    workers = config.completion.workers,
    "Intake started, press Ctrl-C to stop"
  );

  // Downstream consumer: print ready paths on stdout, one per line
  let ready = pipeline.ready();
  let consumer = tokio::spawn(async move {
    while let Some(path) = ready.recv().await {
      println!("{}", path.display());
    }
  });

  tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
  info!("Shutting down");

  let dump = pipeline.stop().await;
  consumer.abort();

  if !dump.is_empty() {
    // Whatever never made it through, for operators chasing lost files
    eprintln!("{}", serde_json::to_string_pretty(&dump)?);
  }
  Ok(())
}

fn print_config(config_path: Option<PathBuf>) -> anyhow::Result<()> {
  let config = Config::resolve(config_path.as_deref())?;
  print!("{}", toml::to_string_pretty(&config)?);
  Ok(())
}
