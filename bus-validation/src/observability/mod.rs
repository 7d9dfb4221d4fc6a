//! Logging setup.
//!
//! The library itself only emits `tracing` events; applications decide where
//! they go. [`init_logging`] is a ready-made subscriber for binaries and
//! examples.

mod logging;

pub use logging::{init_logging, LoggingConfig, LoggingError};
