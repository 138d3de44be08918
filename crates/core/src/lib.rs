//! Shared configuration types for the intake workspace.

mod config;

pub use config::{CompletionConfig, Config, ConfigError, DaemonConfig, FilterConfig};
