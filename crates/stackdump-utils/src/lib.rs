//! # Stackdump Utilities
//!
//! Logging setup for the Stackdump binaries.
//!
//! The engine in `stackdump-core` only emits `tracing` events; this crate
//! decides where they go. Console output always goes to stderr so that traces
//! printed on stdout stay machine-readable.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
