//! # Error Types
//!
//! Error handling for the capture and symbolication engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! None of these errors ever reach the caller of [`crate::capture`]: the
//! pipeline logs them and degrades the affected frames instead. They are
//! returned by the lower-level building blocks (memory map parsing, the
//! in-process DWARF reader, translators) so that callers composing those
//! pieces themselves can decide what to do.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::types::Address;

/// Main error type for stack capture and symbolication
///
/// ## Error Categories
///
/// 1. **Capture errors**: CaptureUnavailable
/// 2. **Resolution errors**: ModuleUnresolved, SymbolUnresolved
/// 3. **Input errors**: MemoryMap, Image
/// 4. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum StackdumpError
{
    /// The unwind primitive produced no frames at all
    #[error("Stack capture unavailable: the unwinder returned no frames")]
    CaptureUnavailable,

    /// The address is not inside any known loaded module
    ///
    /// Typical for JIT-generated code, signal trampolines and the vDSO.
    #[error("No loaded module contains address {0}")]
    ModuleUnresolved(Address),

    /// The module's exported symbol table has no symbol at or before the address
    #[error("No exported symbol at or before address {0}")]
    SymbolUnresolved(Address),

    /// The memory region listing could not be read or contained a bad line
    #[error("Invalid memory map: {0}")]
    MemoryMap(String),

    /// A module image could not be parsed
    #[error("Failed to load image {path}: {reason}")]
    Image
    {
        /// Module that failed to load
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// I/O error (reading region listings, module files, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of a single address-to-line translation call.
///
/// A translator error only ever affects the module it was raised for; the
/// line resolver records it and moves on to the next module.
#[derive(Error, Debug)]
pub enum TranslatorError
{
    /// The translator program could not be started (missing binary, no permission, ...)
    #[error("Translator {program} unavailable: {source}")]
    Unavailable
    {
        /// Program that was spawned
        program: String,
        /// Spawn error reported by the OS
        #[source]
        source: io::Error,
    },

    /// The translator ran but exited unsuccessfully
    #[error("Translator failed for {module}: {status}")]
    Failed
    {
        /// Module whose addresses were being translated
        module: PathBuf,
        /// Exit status of the translator process
        status: ExitStatus,
    },

    /// The module could not be opened or has no usable debug information
    #[error("Translator could not read {module}: {reason}")]
    Image
    {
        /// Module whose addresses were being translated
        module: PathBuf,
        /// What went wrong
        reason: String,
    },
}

/// Convenience type alias for `Result<T, StackdumpError>`
///
/// ```rust
/// use stackdump_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, StackdumpError>;
