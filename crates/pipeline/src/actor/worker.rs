//! Completion workers — verify that staged files have finished being written.
//!
//! A file's size is sampled once per poll interval; two consecutive equal
//! readings mean the writer has gone quiet. That is the whole completion
//! protocol — there is no handshake with the producer, so a file that keeps
//! growing is retried a bounded number of times and then dropped.
//!
//! Workers pull from a shared staging receiver, so adding workers scales
//! the number of files being verified concurrently. Nothing prevents two
//! workers from polling the same path if it gets re-admitted while a check
//! is in flight; admissions are only deduplicated at the filter.

use std::{
  io,
  path::{Path, PathBuf},
  sync::Arc,
  time::Instant,
};

use intake_core::CompletionConfig;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::message::AdmissionRecord;

/// Outcome of one completion check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckOutcome {
  /// Size stabilized at a non-zero value
  Complete,
  /// Still growing, vanished mid-check, or stable at zero bytes
  Incomplete,
  /// Shutdown observed mid-check; the record goes back to staging unspent
  Interrupted,
}

/// Poll the file's size until two consecutive readings agree.
///
/// A file that vanishes is incomplete (deleted mid-check), and a file that
/// stabilizes at zero bytes is incomplete too — empty placeholders are not
/// ready work. Cancellation is only observed between sub-polls, so shutdown
/// latency is bounded by one poll interval rather than the check timeout.
pub(crate) async fn check_completion(
  path: &Path,
  config: &CompletionConfig,
  cancel: &CancellationToken,
) -> CheckOutcome {
  let started = Instant::now();
  let mut last_size: Option<u64> = None;

  while started.elapsed() < config.check_timeout() {
    let size = match tokio::fs::metadata(path).await {
      Ok(meta) => meta.len(),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "File vanished during completion check");
        return CheckOutcome::Incomplete;
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "Failed to stat file during completion check");
        return CheckOutcome::Incomplete;
      }
    };

    if last_size == Some(size) {
      if size != 0 {
        return CheckOutcome::Complete;
      }
      debug!(path = %path.display(), "File stable at zero bytes");
      return CheckOutcome::Incomplete;
    }
    last_size = Some(size);

    tokio::time::sleep(config.poll_interval()).await;
    if cancel.is_cancelled() {
      return CheckOutcome::Interrupted;
    }
  }

  debug!(path = %path.display(), "File never stabilized within the check timeout");
  CheckOutcome::Incomplete
}

/// Completion worker loop.
///
/// Pulls one admission record at a time from the shared staging receiver
/// and routes it: ready queue on success, back to staging with one more
/// retry spent on failure, dropped once the retry budget is gone.
pub(crate) async fn completion_worker(
  worker_id: usize,
  staging_rx: Arc<Mutex<mpsc::UnboundedReceiver<AdmissionRecord>>>,
  staging_tx: mpsc::UnboundedSender<AdmissionRecord>,
  ready_tx: mpsc::UnboundedSender<PathBuf>,
  config: CompletionConfig,
  cancel: CancellationToken,
) {
  trace!(worker_id, "Completion worker starting");
  let mut confirmed = 0usize;

  loop {
    // Take the next record from the shared receiver
    let record = {
      let mut rx = staging_rx.lock().await;
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          trace!(worker_id, confirmed, "Completion worker cancelled");
          break;
        }
        record = rx.recv() => match record {
          Some(record) => record,
          None => {
            trace!(worker_id, confirmed, "Staging queue closed");
            break;
          }
        }
      }
    };

    match check_completion(&record.path, &config, &cancel).await {
      CheckOutcome::Complete => {
        info!(worker_id, path = %record.path.display(), "File ready");
        confirmed += 1;
        if ready_tx.send(record.path).is_err() {
          debug!(worker_id, "Ready queue closed");
          break;
        }
      }

      CheckOutcome::Incomplete => {
        if record.retry_count < config.max_retries {
          info!(
            worker_id,
            path = %record.path.display(),
            retry = record.retry_count + 1,
            max_retries = config.max_retries,
            "File incomplete, re-queueing"
          );
          let _ = staging_tx.send(record.retried());
        } else {
          warn!(
            worker_id,
            path = %record.path.display(),
            max_retries = config.max_retries,
            "File still incomplete after all retries, giving up"
          );
        }
      }

      CheckOutcome::Interrupted => {
        // Put the record back so the shutdown dump accounts for it.
        let _ = staging_tx.send(record);
        break;
      }
    }
  }

  trace!(worker_id, confirmed, "Completion worker finished");
}
