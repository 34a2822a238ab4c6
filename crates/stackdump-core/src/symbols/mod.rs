//! # Symbol Resolution
//!
//! Names for captured addresses: [`SymbolResolver`] finds the nearest exported
//! symbol through the dynamic loader, and [`demangle`] turns its linkage name
//! into a display name. Both are best effort; a missing or undemanglable name
//! never fails a trace.

pub mod demangle;
pub mod resolver;

pub use demangle::{demangle, make_symbol_name};
pub use resolver::{RawSymbol, SymbolResolver};
