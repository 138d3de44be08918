//! Record types handed between pipeline stages.
//!
//! Records are single-owner: whichever stage holds one owns it until it is
//! pushed to the next queue or dropped.

use std::path::PathBuf;

use serde::Serialize;

// ============================================================================
// Change Events
// ============================================================================

/// What happened to a path, as reported by the watch source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
  Created,
  Modified,
  /// Renamed or moved; `dest` is where the file lives now
  Moved { dest: PathBuf },
  Deleted,
}

/// A filesystem change notification for one path
#[derive(Debug, Clone)]
pub struct ChangeEvent {
  pub path: PathBuf,
  pub is_directory: bool,
  pub kind: ChangeKind,
}

impl ChangeEvent {
  pub fn created(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      is_directory: false,
      kind: ChangeKind::Created,
    }
  }

  pub fn created_dir(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      is_directory: true,
      kind: ChangeKind::Created,
    }
  }

  pub fn modified(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      is_directory: false,
      kind: ChangeKind::Modified,
    }
  }

  pub fn moved(path: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      is_directory: false,
      kind: ChangeKind::Moved { dest: dest.into() },
    }
  }

  pub fn deleted(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      is_directory: false,
      kind: ChangeKind::Deleted,
    }
  }
}

// ============================================================================
// Staging Records
// ============================================================================

/// A path admitted for completion checking, with its retry budget spent so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionRecord {
  pub path: PathBuf,
  pub retry_count: u32,
}

impl AdmissionRecord {
  /// A fresh admission with no retries spent
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      retry_count: 0,
    }
  }

  /// The same path, one retry later
  pub fn retried(self) -> Self {
    Self {
      retry_count: self.retry_count + 1,
      ..self
    }
  }
}

// ============================================================================
// Shutdown Diagnostics
// ============================================================================

/// Exact contents of both queues at the moment the pipeline stopped.
///
/// Anything listed here was admitted but never confirmed ready (staging) or
/// confirmed but never picked up (ready).
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueDump {
  pub staging: Vec<AdmissionRecord>,
  pub ready: Vec<PathBuf>,
}

impl QueueDump {
  pub fn is_empty(&self) -> bool {
    self.staging.is_empty() && self.ready.is_empty()
  }
}
