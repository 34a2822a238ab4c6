//! # Types
//!
//! Data model shared by every stage of the pipeline.
//!
//! A capture produces a [`Trace`], an ordered list of [`Frame`]s. Each frame
//! starts out with only its raw return address and is enriched stage by stage
//! with its owning module, its symbol and its source location.

pub mod address;
pub mod frame;
pub mod symbols;
pub mod trace;

// Re-export all public types
pub use address::Address;
pub use frame::{Frame, FrameModule};
pub use symbols::{SourceLocation, SymbolLanguage, SymbolName};
pub use trace::Trace;
