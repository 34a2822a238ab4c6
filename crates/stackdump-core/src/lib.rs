//! # stackdump-core
//!
//! Native call stack capture and symbolication.
//!
//! This crate captures the current thread's call stack and turns the raw
//! return addresses into a readable trace:
//! - Frame capture (`backtrace`)
//! - Module resolution through the dynamic loader or `/proc/self/maps`
//! - Exported symbol lookup and Rust/C++ demangling
//! - Batched source line translation, one translator call per module
//! - Plain-text rendering
//!
//! ## Quick start
//!
//! ```rust,no_run
//! let trace = stackdump_core::capture(32);
//! eprint!("{trace}");
//! ```
//!
//! Capture never fails: whatever cannot be resolved is left out of the frame,
//! down to a trace of bare addresses.
//!
//! ## Platform Support
//!
//! - **Linux**: loader introspection (`dladdr`, `dl_iterate_phdr`) and the
//!   `/proc/self/maps` fallback
//! - **macOS**: loader introspection through `dladdr`
//! - **Other targets**: raw addresses only
//!
//! ## Why unsafe code is needed
//!
//! Loader introspection goes through C APIs (`dladdr`, `dl_iterate_phdr`,
//! `sysconf`) that hand out raw pointers. These calls are wrapped in safe
//! functions in [`platform`].

#![allow(unsafe_code)] // Required for dynamic loader FFI

use once_cell::sync::Lazy;

pub mod capture;
pub mod config;
pub mod error;
pub mod format;
pub mod lines;
pub mod modules;
pub mod platform;
pub mod state;
pub mod symbols;
pub mod tracer;
pub mod types;

pub use config::{MapSnapshot, TraceConfig, TranslatorKind};
// Re-export commonly used types
pub use error::{Result, StackdumpError, TranslatorError};
pub use format::{render, TraceFormatter};
pub use lines::{LineInfo, LineTranslator};
pub use modules::{OffsetCorrection, ResolutionStrategy};
pub use state::SharedState;
pub use tracer::Tracer;
pub use types::{Address, Frame, Trace};

static ENV_CONFIG: Lazy<TraceConfig> = Lazy::new(TraceConfig::from_env);

/// Capture the caller's stack with the environment's configuration.
///
/// Returns at most `max_depth` frames, frame 0 being the return address into
/// the caller. `0` yields an empty trace. See [`TraceConfig::from_env`] for
/// the variables consulted (read once per process).
#[inline(never)]
pub fn capture(max_depth: usize) -> Trace
{
    let trace = Tracer::new(ENV_CONFIG.clone()).capture_below(max_depth, capture as usize);
    tracer::keep_frame(trace)
}
