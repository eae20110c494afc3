//! # Logging Bootstrap
//!
//! Process-level `tracing` setup for binaries built on this crate. The
//! library itself only emits events; installing a subscriber is left to the
//! program, which calls [`init_tracing`] once at startup.

/// Subscriber installation with console and rolling-file layers.
pub mod tracing_init;

pub use tracing_init::{init_tracing, LogOptions, LoggerError};
