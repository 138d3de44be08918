//! intake — ready-file detection for a watched directory tree.
//!
//! Raw filesystem events are noisy: editors fire bursts of modifications,
//! uploads arrive over many seconds, atomic replaces go through temp files.
//! This crate filters that stream down to paths whose contents have
//! verifiably finished arriving, and hands them to a downstream consumer.
//!
//! # Pipeline
//!
//! ```text
//! WatchSource (notify) ──▶ EventFilter ──▶ staging queue ──▶ workers ──▶ ready queue
//!                          debounce +       (path, retry)    size-        consumer
//!                          temp filter                       stability
//! ```
//!
//! [`Pipeline::start`] wires the stages together; [`Pipeline::ready`] hands
//! out the consumer end.

mod actor;
mod source;

pub use actor::{
  EventFilter, Pipeline, PipelineError, PipelineOptions, ReadyQueue,
  message::{AdmissionRecord, ChangeEvent, ChangeKind, QueueDump},
};
pub use source::{WatchError, WatchSource};
