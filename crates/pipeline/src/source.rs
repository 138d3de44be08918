//! Watch source — bridges the notify backend into the pipeline.
//!
//! notify reports raw OS events via a sync callback on its own thread. The
//! callback translates each event into [`ChangeEvent`]s and forwards them
//! over a bounded channel with `blocking_send`, so the rest of the pipeline
//! never sees a notify type. If the channel is closed the event is dropped;
//! that only happens while the pipeline is shutting down.

use std::path::{Path, PathBuf};

use notify::{
  Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
  event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::actor::message::{ChangeEvent, ChangeKind};

/// Errors from the underlying watch backend
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
  #[error("Failed to initialize watcher: {0}")]
  Init(#[source] notify::Error),

  #[error("Failed to watch path: {0}")]
  Watch(#[source] notify::Error),

  #[error("Failed to unwatch path: {0}")]
  Unwatch(#[source] notify::Error),
}

/// Recursive filesystem subscription for a root directory.
///
/// Holding the source keeps the OS watch alive; dropping it ends delivery.
/// `detach`/`attach` unsubscribe and resubscribe the root for pause/resume —
/// events that fire while detached are not replayed.
pub struct WatchSource {
  watcher: RecommendedWatcher,
  root: PathBuf,
  attached: bool,
}

impl WatchSource {
  /// Start watching `root`, delivering translated events into `tx`.
  pub fn new(root: &Path, tx: mpsc::Sender<ChangeEvent>) -> Result<Self, WatchError> {
    let mut watcher = RecommendedWatcher::new(
      move |res: Result<Event, notify::Error>| match res {
        Ok(event) => {
          // Runs on notify's thread; blocking_send is the bridge into tokio
          for change in translate(event) {
            if tx.blocking_send(change).is_err() {
              return;
            }
          }
        }
        Err(e) => warn!(error = %e, "Watch backend error"),
      },
      NotifyConfig::default(),
    )
    .map_err(WatchError::Init)?;

    watcher.watch(root, RecursiveMode::Recursive).map_err(WatchError::Watch)?;
    info!(root = %root.display(), "Watch source attached");

    Ok(Self {
      watcher,
      root: root.to_path_buf(),
      attached: true,
    })
  }

  /// Detach from the live event stream. No-op when already detached.
  pub fn detach(&mut self) -> Result<(), WatchError> {
    if !self.attached {
      return Ok(());
    }
    self.watcher.unwatch(&self.root).map_err(WatchError::Unwatch)?;
    self.attached = false;
    info!(root = %self.root.display(), "Watch source detached");
    Ok(())
  }

  /// Re-attach after a `detach`. No-op when already attached.
  pub fn attach(&mut self) -> Result<(), WatchError> {
    if self.attached {
      return Ok(());
    }
    self
      .watcher
      .watch(&self.root, RecursiveMode::Recursive)
      .map_err(WatchError::Watch)?;
    self.attached = true;
    info!(root = %self.root.display(), "Watch source re-attached");
    Ok(())
  }
}

/// Translate one notify event into pipeline change events.
///
/// Renames reported with both paths become a single `Moved`; one-sided
/// renames degrade to `Deleted` (from) or `Created` (to), matching how the
/// backends report cross-directory moves.
fn translate(event: Event) -> Vec<ChangeEvent> {
  let mut changes = Vec::new();

  match event.kind {
    EventKind::Create(kind) => {
      for path in event.paths {
        let is_directory = matches!(kind, CreateKind::Folder) || path.is_dir();
        changes.push(ChangeEvent {
          path,
          is_directory,
          kind: ChangeKind::Created,
        });
      }
    }

    EventKind::Modify(ModifyKind::Name(mode)) => match mode {
      RenameMode::Both if event.paths.len() >= 2 => {
        let dest = event.paths[1].clone();
        changes.push(ChangeEvent {
          path: event.paths[0].clone(),
          is_directory: dest.is_dir(),
          kind: ChangeKind::Moved { dest },
        });
      }
      RenameMode::Both => {
        debug!(paths = ?event.paths, "Rename event missing a side, treating as modification");
        for path in event.paths {
          let is_directory = path.is_dir();
          changes.push(ChangeEvent {
            path,
            is_directory,
            kind: ChangeKind::Modified,
          });
        }
      }
      RenameMode::From => {
        for path in event.paths {
          changes.push(ChangeEvent {
            path,
            is_directory: false,
            kind: ChangeKind::Deleted,
          });
        }
      }
      RenameMode::To => {
        for path in event.paths {
          let is_directory = path.is_dir();
          changes.push(ChangeEvent {
            path,
            is_directory,
            kind: ChangeKind::Created,
          });
        }
      }
      RenameMode::Any | RenameMode::Other => {
        for path in event.paths {
          let is_directory = path.is_dir();
          changes.push(ChangeEvent {
            path,
            is_directory,
            kind: ChangeKind::Modified,
          });
        }
      }
    },

    EventKind::Modify(_) => {
      for path in event.paths {
        let is_directory = path.is_dir();
        changes.push(ChangeEvent {
          path,
          is_directory,
          kind: ChangeKind::Modified,
        });
      }
    }

    EventKind::Remove(kind) => {
      for path in event.paths {
        changes.push(ChangeEvent {
          path,
          is_directory: matches!(kind, RemoveKind::Folder),
          kind: ChangeKind::Deleted,
        });
      }
    }

    EventKind::Access(_) | EventKind::Any | EventKind::Other => {
      trace!(kind = ?event.kind, "Ignoring event");
    }
  }

  changes
}
