//! Stack frame types.

use std::path::{Path, PathBuf};

use super::symbols::{SourceLocation, SymbolName};
use super::Address;

/// Module that owns a frame's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameModule
{
    /// Absolute, symlink-resolved path of the executable or shared object.
    pub path: PathBuf,
    /// `raw_address - load base`; the address handed to line translators.
    pub offset: u64,
}

/// One entry of a captured call stack.
///
/// The optional parts nest so that the data model invariants hold by
/// construction: a module-relative offset only exists together with a module
/// path, and a source line only together with a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame
{
    /// Position in the trace (0 = immediate caller of the capture).
    pub index: usize,
    /// Return address exactly as captured.
    pub raw_address: Address,
    /// Owning module, if the address falls inside one.
    pub module: Option<FrameModule>,
    /// Best-effort symbol for the frame.
    pub symbol: Option<SymbolName>,
    /// Best-effort source location.
    pub location: Option<SourceLocation>,
}

impl Frame
{
    /// A frame that only knows its raw address.
    pub fn new(index: usize, raw_address: Address) -> Self
    {
        Self {
            index,
            raw_address,
            module: None,
            symbol: None,
            location: None,
        }
    }

    /// Attach the owning module and the address relative to its load base.
    #[must_use]
    pub fn with_module(mut self, path: impl Into<PathBuf>, offset: u64) -> Self
    {
        self.module = Some(FrameModule {
            path: path.into(),
            offset,
        });
        self
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: SymbolName) -> Self
    {
        self.symbol = Some(symbol);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self
    {
        self.location = Some(location);
        self
    }

    pub fn module_path(&self) -> Option<&Path>
    {
        self.module.as_ref().map(|module| module.path.as_path())
    }

    pub fn module_relative_offset(&self) -> Option<u64>
    {
        self.module.as_ref().map(|module| module.offset)
    }

    /// Display form of the symbol name.
    pub fn symbol_name(&self) -> Option<&str>
    {
        self.symbol.as_ref().map(SymbolName::display_name)
    }

    pub fn source_file(&self) -> Option<&str>
    {
        self.location.as_ref().map(|location| location.file.as_str())
    }

    pub fn source_line(&self) -> Option<u32>
    {
        self.location.as_ref().and_then(|location| location.line)
    }

    /// Whether nothing beyond the raw address could be resolved.
    pub fn is_raw(&self) -> bool
    {
        self.module.is_none() && self.symbol.is_none() && self.location.is_none()
    }
}
