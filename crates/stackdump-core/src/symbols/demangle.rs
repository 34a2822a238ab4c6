//! Symbol demangling utilities.
//!
//! Compilers "mangle" symbol names to encode namespaces and types. This module
//! turns linkage names back into readable form and guesses their language:
//!
//! - **Rust**: v0 (`_R...`) and legacy (`_ZN...E`) manglings, via `rustc_demangle`
//! - **C++**: Itanium ABI (`_Z...`), via `cpp_demangle`
//! - **C**: unmangled globals
//!
//! Demangling is total: whatever the input, a display name comes back.

use cpp_demangle::{DemangleOptions, Symbol};
use rustc_demangle::try_demangle;

use crate::types::{SymbolLanguage, SymbolName};

/// Demangle a linkage name, returning it unchanged when it is not a
/// recognised mangled form.
///
/// Rust manglings are tried first; legacy Rust names are also valid Itanium
/// names and would otherwise keep their hash segment. The alternate Rust
/// rendering drops the legacy hash suffix (`::h0123...`).
///
/// ```rust
/// use stackdump_core::symbols::demangle;
///
/// assert_eq!(demangle("_ZN4core3fmt5write17h0123456789abcdefE"), "core::fmt::write");
/// assert_eq!(demangle("_Z3foov"), "foo()");
/// assert_eq!(demangle("not mangled at all"), "not mangled at all");
/// ```
pub fn demangle(raw: &str) -> String
{
    demangle_with_language(raw).map_or_else(|| raw.to_string(), |(demangled, _)| demangled)
}

fn demangle_with_language(raw: &str) -> Option<(String, SymbolLanguage)>
{
    if let Ok(demangled) = try_demangle(raw) {
        return Some((format!("{demangled:#}"), SymbolLanguage::Rust));
    }
    if !raw.starts_with("_Z") {
        return None;
    }
    let symbol = Symbol::new(raw).ok()?;
    let demangled = symbol.demangle(&DemangleOptions::default()).ok()?;
    Some((demangled, SymbolLanguage::Cpp))
}

/// Create a [`SymbolName`] from a raw linkage name.
///
/// The demangled form is only recorded when demangling succeeded, so
/// [`SymbolName::display_name`] falls back to the raw name otherwise.
pub fn make_symbol_name(raw: String) -> SymbolName
{
    let (demangled, language) = match demangle_with_language(&raw) {
        Some((demangled, language)) => (Some(demangled), Some(language)),
        None => (None, None),
    };
    let language = if let Some(language) = language {
        language
    } else if raw.starts_with("_R") || raw.contains("::") {
        SymbolLanguage::Rust
    } else if raw.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else if raw.is_empty() {
        SymbolLanguage::Unknown
    } else {
        SymbolLanguage::C
    };

    SymbolName::new(raw, demangled, language)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_legacy_rust_symbol()
    {
        let name = make_symbol_name("_ZN4core3fmt5write17h0123456789abcdefE".to_string());
        assert_eq!(name.display_name(), "core::fmt::write");
        assert_eq!(name.language(), SymbolLanguage::Rust);
    }

    #[test]
    fn test_v0_rust_symbol()
    {
        assert_eq!(demangle("_RNvC7mycrate3foo"), "mycrate::foo");
    }

    #[test]
    fn test_cpp_symbol()
    {
        let name = make_symbol_name("_ZNSt6vectorIiSaIiEE9push_backERKi".to_string());
        assert_eq!(name.language(), SymbolLanguage::Cpp);
        let display = name.display_name();
        assert!(display.starts_with("std::vector<int"), "got {display}");
        assert!(display.contains("::push_back("), "got {display}");
        assert_eq!(name.raw(), "_ZNSt6vectorIiSaIiEE9push_backERKi");
    }

    #[test]
    fn test_cpp_free_function()
    {
        assert_eq!(demangle("_Z3foov"), "foo()");
        assert_eq!(demangle("_Z3addii"), "add(int, int)");
    }

    #[test]
    fn test_invalid_cpp_mangling_stays_raw()
    {
        let name = make_symbol_name("_Z!!".to_string());
        assert_eq!(name.display_name(), "_Z!!");
        assert_eq!(name.demangled(), None);
        assert_eq!(name.language(), SymbolLanguage::Cpp);
    }

    #[test]
    fn test_plain_c_symbol_is_unchanged()
    {
        let name = make_symbol_name("malloc".to_string());
        assert_eq!(name.display_name(), "malloc");
        assert_eq!(name.demangled(), None);
        assert_eq!(name.language(), SymbolLanguage::C);
    }

    #[test]
    fn test_invalid_mangling_falls_back_to_raw()
    {
        assert_eq!(demangle("_ZN3foo"), "_ZN3foo");
        assert_eq!(demangle("_RNv!!garbage"), "_RNv!!garbage");
    }
}
