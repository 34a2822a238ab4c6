//! Nearest-exported-symbol lookup through the dynamic loader.

use tracing::trace;

use crate::error::{Result, StackdumpError};
use crate::modules::ModuleInfo;
use crate::platform;
use crate::types::Address;

/// A symbol as found in a module's exported symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSymbol
{
    /// Linkage (possibly mangled) name.
    pub name: String,
    /// Start address of the symbol, when the loader reports it.
    pub address: Option<Address>,
}

/// Finds the nearest exported symbol at or before an address.
///
/// Symbol sizes are not consulted, so an address past the end of a symbol is
/// attributed to that symbol when nothing else is exported after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolResolver;

impl SymbolResolver
{
    pub fn new() -> Self
    {
        Self
    }

    /// Look up the symbol covering `address` inside `module`.
    ///
    /// ## Errors
    ///
    /// Returns [`StackdumpError::SymbolUnresolved`] when the address has no
    /// module or the module exports nothing at or before it.
    pub fn resolve_symbol(&self, address: Address, module: Option<&ModuleInfo>) -> Result<RawSymbol>
    {
        if module.is_none() {
            return Err(StackdumpError::SymbolUnresolved(address));
        }

        let info = platform::dladdr(address).ok_or(StackdumpError::SymbolUnresolved(address))?;
        let name = info.symbol_name.ok_or(StackdumpError::SymbolUnresolved(address))?;
        trace!(%address, symbol = %name, "exported symbol");

        Ok(RawSymbol {
            name,
            address: info.symbol_address,
        })
    }
}

#[cfg(test)]
mod tests
{
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_no_module_means_no_symbol()
    {
        let err = SymbolResolver::new().resolve_symbol(Address::from(0x1234_u64), None).unwrap_err();
        assert!(matches!(err, StackdumpError::SymbolUnresolved(_)));
    }

    #[test]
    fn test_unmapped_address_has_no_symbol()
    {
        let module = ModuleInfo {
            path: PathBuf::from("/nonexistent"),
            base: Address::ZERO,
        };
        assert!(SymbolResolver::new().resolve_symbol(Address::from(0x10_u64), Some(&module)).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_exported_libc_symbol()
    {
        // SAFETY: the name is NUL-terminated and RTLD_DEFAULT is always valid.
        let pointer = unsafe { libc::dlsym(libc::RTLD_DEFAULT, b"getpid\0".as_ptr().cast()) };
        assert!(!pointer.is_null());
        let address = Address::from(pointer as usize as u64);
        let module = ModuleInfo {
            path: PathBuf::from("libc"),
            base: Address::ZERO,
        };
        let symbol = SymbolResolver::new().resolve_symbol(address, Some(&module)).unwrap();
        assert!(symbol.name.contains("getpid"), "unexpected symbol {}", symbol.name);
    }
}
