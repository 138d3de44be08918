//! Event filter — decides which filesystem events enter the staging queue.
//!
//! The filter runs on the single event-delivery task and owns all of its
//! state, so the debounce ledger needs no locking. Rules, in order:
//!
//! - Temp files from atomic-replace writes are excluded from create handling.
//! - A created directory backfills every file it already contains (a
//!   directory dropped into the watch root arrives as one event).
//! - Creates and modifications are debounced per path: repeats inside the
//!   ignore window are dropped without refreshing the window.
//! - Moves admit the destination unconditionally. Deletes are informational.
//!
//! Every admission pushes an [`AdmissionRecord`] with a zero retry count;
//! the completion workers take it from there.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::{Duration, Instant},
};

use intake_core::FilterConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::message::{AdmissionRecord, ChangeEvent, ChangeKind};

// ============================================================================
// Debounce Ledger
// ============================================================================

/// Last-admission stamps per path, pruned lazily.
///
/// Pruning runs at most once per cleanup interval so a burst of events does
/// not pay a full-map sweep each time; entries older than the interval are
/// dropped when it does run.
struct DebounceLedger {
  entries: HashMap<PathBuf, Instant>,
  ignore_window: Duration,
  cleanup_interval: Duration,
  last_prune: Instant,
}

impl DebounceLedger {
  fn new(ignore_window: Duration, cleanup_interval: Duration) -> Self {
    Self {
      entries: HashMap::new(),
      ignore_window,
      cleanup_interval,
      last_prune: Instant::now(),
    }
  }

  /// Debounce check for one path.
  ///
  /// A rejection does not refresh the stamp: the window is measured from the
  /// last *accepted* event, so a steady stream of rejected repeats still
  /// reopens the window once the original interval elapses.
  fn should_admit(&mut self, path: &Path) -> bool {
    let now = Instant::now();
    if let Some(last) = self.entries.get(path)
      && now.duration_since(*last) < self.ignore_window
    {
      return false;
    }
    self.entries.insert(path.to_path_buf(), now);
    true
  }

  /// Record an admission that bypassed the debounce check (moves).
  fn stamp(&mut self, path: &Path) {
    self.entries.insert(path.to_path_buf(), Instant::now());
  }

  /// Drop stale entries, at most once per cleanup interval.
  fn prune_if_due(&mut self) {
    let now = Instant::now();
    if now.duration_since(self.last_prune) < self.cleanup_interval {
      return;
    }

    let before = self.entries.len();
    let horizon = self.cleanup_interval;
    self.entries.retain(|_, last| now.duration_since(*last) <= horizon);
    self.last_prune = now;

    if before != self.entries.len() {
      debug!(
        removed = before - self.entries.len(),
        remaining = self.entries.len(),
        "Pruned debounce ledger"
      );
    }
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  fn contains(&self, path: &Path) -> bool {
    self.entries.contains_key(path)
  }
}

// ============================================================================
// Event Filter
// ============================================================================

/// Admission stage of the pipeline.
///
/// Consumes [`ChangeEvent`]s and pushes [`AdmissionRecord`]s onto the
/// staging queue. Owned by a single task; `admit` is synchronous.
pub struct EventFilter {
  staging_tx: mpsc::UnboundedSender<AdmissionRecord>,
  ledger: DebounceLedger,
  temp_prefixes: Vec<String>,
}

impl EventFilter {
  pub fn new(config: &FilterConfig, staging_tx: mpsc::UnboundedSender<AdmissionRecord>) -> Self {
    Self {
      staging_tx,
      ledger: DebounceLedger::new(config.event_ignore(), config.cleanup_interval()),
      temp_prefixes: config.temp_prefixes.clone(),
    }
  }

  /// Apply the admission rules to one change event.
  pub fn admit(&mut self, event: ChangeEvent) {
    match event.kind {
      ChangeKind::Created => {
        if self.is_temp(&event.path) {
          debug!(path = %event.path.display(), "Excluding temp file");
          return;
        }
        if event.is_directory {
          info!(path = %event.path.display(), "New directory detected");
          self.backfill_directory(&event.path);
        } else {
          self.admit_created(&event.path);
        }
      }

      ChangeKind::Modified => {
        if event.is_directory {
          debug!(path = %event.path.display(), "Directory modified");
          return;
        }
        if !self.ledger.should_admit(&event.path) {
          debug!(path = %event.path.display(), "Ignoring rapid repeat modification");
          return;
        }
        info!(path = %event.path.display(), "File modified, staged for completion check");
        self.push(AdmissionRecord::new(event.path));
        self.ledger.prune_if_due();
      }

      ChangeKind::Moved { dest } => {
        if event.is_directory {
          info!(from = %event.path.display(), to = %dest.display(), "Directory moved");
          return;
        }
        // Moves are admitted without a debounce check; they only stamp the
        // ledger so trailing modifications of the destination are debounced.
        info!(from = %event.path.display(), to = %dest.display(), "File moved, staging destination");
        self.ledger.stamp(&dest);
        self.push(AdmissionRecord::new(dest));
        self.ledger.prune_if_due();
      }

      ChangeKind::Deleted => {
        if event.is_directory {
          info!(path = %event.path.display(), "Directory deleted");
        } else {
          info!(path = %event.path.display(), "File deleted");
        }
      }
    }
  }

  fn admit_created(&mut self, path: &Path) {
    if !self.ledger.should_admit(path) {
      debug!(path = %path.display(), "Ignoring rapid repeat create");
      return;
    }
    info!(path = %path.display(), "New file staged for completion check");
    self.push(AdmissionRecord::new(path.to_path_buf()));
  }

  /// A created directory backfills every file it already contains, each
  /// going through the same admission check as a lone file create.
  fn backfill_directory(&mut self, dir: &Path) {
    for entry in WalkDir::new(dir) {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          warn!(error = %e, "Skipping unreadable entry during directory backfill");
          continue;
        }
      };
      if !entry.file_type().is_file() {
        continue;
      }

      let path = entry.path();
      if self.is_temp(path) {
        debug!(path = %path.display(), "Excluding temp file in new directory");
        continue;
      }
      if !self.ledger.should_admit(path) {
        debug!(path = %path.display(), "Ignoring already-seen file in new directory");
        continue;
      }
      info!(path = %path.display(), "File in new directory staged for completion check");
      self.push(AdmissionRecord::new(path.to_path_buf()));
    }
  }

  fn is_temp(&self, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
      return false;
    };
    self.temp_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
  }

  fn push(&mut self, record: AdmissionRecord) {
    // The receiver lives as long as the pipeline; a closed queue means
    // shutdown raced this event.
    if self.staging_tx.send(record).is_err() {
      debug!("Staging queue closed, dropping admission");
    }
  }
}
