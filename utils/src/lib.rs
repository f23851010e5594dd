//! Shared utilities for the Whispr client.

pub mod logging;

pub use logging::{init_logging, init_tracing, LogFormat, LogFormatError};
