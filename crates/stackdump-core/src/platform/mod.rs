//! # Platform-Specific Loader Access
//!
//! Thin safe wrappers around the dynamic loader APIs used by the resolvers:
//!
//! - **unix**: `dladdr(3)` for the containing object, its base and the nearest
//!   exported symbol
//!   - See: [dladdr(3) man page](https://man7.org/linux/man-pages/man3/dladdr.3.html)
//! - **linux**: `dl_iterate_phdr(3)` for the loader's load bias (`l_addr`) of
//!   the object whose loadable segments contain an address
//!   - See: [dl_iterate_phdr(3) man page](https://man7.org/linux/man-pages/man3/dl_iterate_phdr.3.html)
//!
//! On other targets every lookup answers `None` and frames degrade to raw
//! addresses.

use std::path::PathBuf;

use crate::types::Address;

#[cfg(unix)]
mod dl;
#[cfg(target_os = "linux")]
mod phdr;

/// What `dladdr` knows about an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlInfo
{
    /// Path of the containing object as the loader recorded it (may be relative or empty).
    pub file_name: Option<String>,
    /// Address the containing object's image starts at.
    pub file_base: Address,
    /// Name of the nearest exported symbol at or below the address.
    pub symbol_name: Option<String>,
    /// Address of that symbol.
    pub symbol_address: Option<Address>,
}

/// A loaded object found by walking the loader's program headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedObject
{
    /// Object name; `None` for the main executable, which the loader leaves unnamed.
    pub name: Option<PathBuf>,
    /// Difference between runtime and link-time addresses.
    pub load_bias: Address,
}

/// Ask the loader which object contains `address`.
pub fn dladdr(address: Address) -> Option<DlInfo>
{
    #[cfg(unix)]
    {
        dl::dladdr(address)
    }
    #[cfg(not(unix))]
    {
        let _ = address;
        None
    }
}

/// Find the loaded object whose `PT_LOAD` segments contain `address`.
pub fn loaded_object_for(address: Address) -> Option<LoadedObject>
{
    #[cfg(target_os = "linux")]
    {
        phdr::loaded_object_for(address)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = address;
        None
    }
}

/// Size of a virtual memory page.
pub fn page_size() -> u64
{
    #[cfg(unix)]
    {
        dl::page_size()
    }
    #[cfg(not(unix))]
    {
        4096
    }
}
