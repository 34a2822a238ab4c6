//! # Module Resolution
//!
//! Maps a captured address to the loaded module that contains it and to the
//! module's load base, so that frames can carry a module-relative offset.
//!
//! Two interchangeable strategies implement [`ModuleLookup`]:
//!
//! - [`LoaderResolver`] (**live introspection**): asks the dynamic loader.
//!   The load base is the loader's own load bias, and the path comes from the
//!   loader, falling back to the region listing when the loader has no name.
//! - [`MapResolver`] (**memory-map fallback**): looks the address up in a
//!   [`ModuleMap`] parsed from `/proc/self/maps` and derives the base from
//!   the covering range according to an [`OffsetCorrection`].
//!
//! Both hand out `raw_address - base` as the module-relative offset, which is
//! exactly the address a line translator expects.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Result;
use crate::types::Address;

pub mod fallback;
pub mod image;
pub mod loader;
pub mod maps;

pub use fallback::MapResolver;
pub use loader::LoaderResolver;
pub use maps::{ModuleMap, ModuleRange};

/// A loaded module and the base its addresses are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo
{
    /// Absolute, symlink-resolved path.
    pub path: PathBuf,
    /// Load bias: runtime address minus link-time address.
    pub base: Address,
}

impl ModuleInfo
{
    /// Module-relative offset of an address, if the address is not below the base.
    pub fn offset_of(&self, address: Address) -> Option<u64>
    {
        address.offset_from(self.base)
    }
}

/// Strategy seam for module resolution.
pub trait ModuleLookup
{
    /// Find the module containing `address`.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::error::StackdumpError::ModuleUnresolved`] when no
    /// known module contains the address.
    fn resolve(&self, address: Address) -> Result<ModuleInfo>;
}

/// Which [`ModuleLookup`] implementation the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy
{
    /// Ask the dynamic loader (`dladdr`, `dl_iterate_phdr`).
    LiveIntrospection,
    /// Parse the process's region listing.
    MemoryMapFallback,
}

impl Default for ResolutionStrategy
{
    fn default() -> Self
    {
        if cfg!(unix) {
            ResolutionStrategy::LiveIntrospection
        } else {
            ResolutionStrategy::MemoryMapFallback
        }
    }
}

impl FromStr for ResolutionStrategy
{
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "live" | "loader" | "dladdr" => Ok(ResolutionStrategy::LiveIntrospection),
            "maps" | "map" | "fallback" => Ok(ResolutionStrategy::MemoryMapFallback),
            _ => Err(format!("Unknown resolution strategy: {s}. Use 'live' or 'maps'")),
        }
    }
}

impl fmt::Display for ResolutionStrategy
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            ResolutionStrategy::LiveIntrospection => "live",
            ResolutionStrategy::MemoryMapFallback => "maps",
        };
        write!(f, "{label}")
    }
}

/// How the memory-map fallback turns a covering range into a load base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffsetCorrection
{
    /// Range start minus the page-aligned lowest loadable segment address of
    /// the module file. Correct for both position-independent and
    /// fixed-address objects.
    #[default]
    ElfLoadBias,
    /// Range start as is. Only correct when the lowest segment is linked at 0.
    MappingStart,
}

impl FromStr for OffsetCorrection
{
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "elf" | "bias" | "load-bias" => Ok(OffsetCorrection::ElfLoadBias),
            "mapping" | "start" | "mapping-start" => Ok(OffsetCorrection::MappingStart),
            _ => Err(format!("Unknown offset correction: {s}. Use 'elf' or 'mapping'")),
        }
    }
}

impl fmt::Display for OffsetCorrection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            OffsetCorrection::ElfLoadBias => "elf",
            OffsetCorrection::MappingStart => "mapping",
        };
        write!(f, "{label}")
    }
}
