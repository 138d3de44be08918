//! Pipeline controller — owns the queues, the worker pool, and the watch
//! subscription.
//!
//! # Lifecycle
//!
//! 1. `start` creates both queues and a master `CancellationToken`, attaches
//!    a [`WatchSource`] to the root, and spawns the filter task plus the
//!    completion worker pool.
//! 2. `pause`/`resume` detach and re-attach the watch subscription; staged
//!    work keeps flowing through the workers either way.
//! 3. `stop` cancels everything, waits for the tasks to finish their current
//!    iteration (bounded by one poll interval), and reports whatever was
//!    still queued.

use std::{path::PathBuf, sync::Arc};

use intake_core::{CompletionConfig, Config, FilterConfig};
use tokio::{
  sync::{Mutex, mpsc},
  task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
  filter::EventFilter,
  message::{AdmissionRecord, ChangeEvent, QueueDump},
  worker::completion_worker,
};
use crate::source::{WatchError, WatchSource};

// ============================================================================
// Options
// ============================================================================

/// Everything needed to start a pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
  /// Directory to watch, recursively
  pub root: PathBuf,
  pub filter: FilterConfig,
  pub completion: CompletionConfig,
}

impl PipelineOptions {
  /// Options for `root` with default filter and completion settings
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      filter: FilterConfig::default(),
      completion: CompletionConfig::default(),
    }
  }

  /// Options for `root` taken from a loaded config
  pub fn from_config(root: impl Into<PathBuf>, config: &Config) -> Self {
    Self {
      root: root.into(),
      filter: config.filter.clone(),
      completion: config.completion.clone(),
    }
  }
}

/// Errors starting or controlling a pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error(transparent)]
  Watch(#[from] WatchError),
}

// ============================================================================
// Ready Queue Handle
// ============================================================================

/// Consumer end of the ready queue.
///
/// Cheap to clone; clones share one receiver, so each ready path is
/// delivered to exactly one caller.
#[derive(Clone)]
pub struct ReadyQueue {
  rx: Arc<Mutex<mpsc::UnboundedReceiver<PathBuf>>>,
}

impl ReadyQueue {
  /// Wait for the next ready file.
  ///
  /// Returns `None` once the pipeline has stopped and the queue is drained.
  pub async fn recv(&self) -> Option<PathBuf> {
    self.rx.lock().await.recv().await
  }

  /// Pop a ready file if one is already queued.
  pub async fn try_recv(&self) -> Option<PathBuf> {
    self.rx.lock().await.try_recv().ok()
  }
}

// ============================================================================
// Pipeline
// ============================================================================

/// A running intake pipeline
pub struct Pipeline {
  staging_tx: mpsc::UnboundedSender<AdmissionRecord>,
  staging_rx: Arc<Mutex<mpsc::UnboundedReceiver<AdmissionRecord>>>,
  ready: ReadyQueue,
  cancel: CancellationToken,
  source: WatchSource,
  filter_task: JoinHandle<()>,
  workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
  /// Start watching `options.root` and spawn the pipeline tasks.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(options: PipelineOptions) -> Result<Self, PipelineError> {
    let (staging_tx, staging_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = mpsc::unbounded_channel();
    let staging_rx = Arc::new(Mutex::new(staging_rx));
    let cancel = CancellationToken::new();

    // Watch source; capacity absorbs event bursts from the notify backend
    let (event_tx, event_rx) = mpsc::channel(256);
    let source = WatchSource::new(&options.root, event_tx)?;

    // Filter task: single owner of the event filter and its ledger
    let filter = EventFilter::new(&options.filter, staging_tx.clone());
    let filter_task = tokio::spawn(run_filter(event_rx, filter, cancel.clone()));

    // Completion worker pool
    let worker_count = options.completion.workers.max(1);
    let workers = (0..worker_count)
      .map(|worker_id| {
        tokio::spawn(completion_worker(
          worker_id,
          staging_rx.clone(),
          staging_tx.clone(),
          ready_tx.clone(),
          options.completion.clone(),
          cancel.clone(),
        ))
      })
      .collect();

    info!(
      root = %options.root.display(),
      workers = worker_count,
      "Pipeline started"
    );

    Ok(Self {
      staging_tx,
      staging_rx,
      ready: ReadyQueue {
        rx: Arc::new(Mutex::new(ready_rx)),
      },
      cancel,
      source,
      filter_task,
      workers,
    })
  }

  /// Consumer handle for the ready queue.
  pub fn ready(&self) -> ReadyQueue {
    self.ready.clone()
  }

  /// Detach from the live event stream. Already-staged work is unaffected.
  pub fn pause(&mut self) -> Result<(), PipelineError> {
    self.source.detach()?;
    info!("Pipeline paused");
    Ok(())
  }

  /// Re-attach to the live event stream after a `pause`.
  pub fn resume(&mut self) -> Result<(), PipelineError> {
    self.source.attach()?;
    info!("Pipeline resumed");
    Ok(())
  }

  /// Admit externally-sourced paths directly, bypassing the debounce check.
  ///
  /// Intended for change lists produced by a sync job; the caller is
  /// expected to have deduplicated them.
  pub fn inject_paths<I>(&self, paths: I)
  where
    I: IntoIterator<Item = PathBuf>,
  {
    for path in paths {
      info!(path = %path.display(), "Injected path staged for completion check");
      if self.staging_tx.send(AdmissionRecord::new(path)).is_err() {
        debug!("Staging queue closed, dropping injected path");
        return;
      }
    }
  }

  /// Stop the pipeline and report what was left in flight.
  ///
  /// Workers finish their current size sub-poll before exiting, so this
  /// returns within roughly one poll interval.
  pub async fn stop(self) -> QueueDump {
    let Self {
      staging_tx,
      staging_rx,
      ready,
      cancel,
      source,
      filter_task,
      workers,
    } = self;

    info!("Pipeline stopping");
    cancel.cancel();
    // Stop event delivery before draining, so the dump is a stable snapshot
    drop(source);

    if let Err(e) = filter_task.await {
      warn!(error = %e, "Filter task panicked");
    }
    for (worker_id, worker) in workers.into_iter().enumerate() {
      if let Err(e) = worker.await {
        warn!(worker_id, error = %e, "Completion worker panicked");
      }
    }

    drop(staging_tx);
    let mut dump = QueueDump::default();
    {
      let mut rx = staging_rx.lock().await;
      while let Ok(record) = rx.try_recv() {
        dump.staging.push(record);
      }
    }
    while let Some(path) = ready.try_recv().await {
      dump.ready.push(path);
    }

    info!(
      staging = dump.staging.len(),
      ready = dump.ready.len(),
      "Pipeline stopped"
    );
    dump
  }
}

/// Event-delivery loop: feeds the filter until cancelled or the source closes.
async fn run_filter(mut events: mpsc::Receiver<ChangeEvent>, mut filter: EventFilter, cancel: CancellationToken) {
  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        debug!("Event filter shutting down (cancelled)");
        break;
      }
      event = events.recv() => match event {
        Some(event) => filter.admit(event),
        None => {
          debug!("Event filter shutting down (source closed)");
          break;
        }
      }
    }
  }
}
