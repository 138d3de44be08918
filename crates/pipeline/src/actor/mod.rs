//! Actor tasks making up the intake pipeline.
//!
//! Each stage is a long-lived tokio task owning its state outright and
//! communicating over channels:
//!
//! - The filter task owns the [`EventFilter`] (and with it the debounce
//!   ledger — single writer, no locking) and produces admission records.
//! - Completion workers share the staging receiver and independently verify
//!   that staged files have stopped growing.
//! - [`Pipeline`] supervises both under one `CancellationToken`.

mod controller;
mod filter;
pub mod message;
mod worker;


pub use controller::{Pipeline, PipelineError, PipelineOptions, ReadyQueue};
pub use filter::EventFilter;
