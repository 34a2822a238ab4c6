//! Symbol and source location types.

use std::fmt;

/// Programming language associated with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    /// Rust symbol (detected via mangling or namespace patterns).
    Rust,
    /// C++ symbol (Itanium mangling without Rust extensions).
    Cpp,
    /// C symbol or unmangled global.
    C,
    /// Unknown or mixed language.
    Unknown,
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::C => "c",
            SymbolLanguage::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// A function name with demangling metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
    language: SymbolLanguage,
}

impl SymbolName
{
    /// Construct from a raw linkage name.
    pub fn new(raw: String, demangled: Option<String>, language: SymbolLanguage) -> Self
    {
        Self {
            raw,
            demangled,
            language,
        }
    }

    /// Construct from a name that is already in display form.
    ///
    /// Used for names reported by a line translator, which demangles on its own.
    pub fn display_only(name: impl Into<String>) -> Self
    {
        let name = name.into();
        let language = if name.contains("::") {
            SymbolLanguage::Rust
        } else {
            SymbolLanguage::Unknown
        };
        Self {
            raw: name,
            demangled: None,
            language,
        }
    }

    /// Raw (mangled) name emitted in the object file.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    /// Demangled human-friendly name if available.
    pub fn demangled(&self) -> Option<&str>
    {
        self.demangled.as_deref()
    }

    /// Preferred presentation (demangled fallback to raw).
    pub fn display_name(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }

    /// Language classification for the symbol.
    pub fn language(&self) -> SymbolLanguage
    {
        self.language
    }
}

impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}

/// Source code location for a frame.
///
/// A location always has a file; the line is only present when it is known
/// and non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    /// Path as reported by the debug information.
    pub file: String,
    /// Line number, if known (never zero).
    pub line: Option<u32>,
}

impl SourceLocation
{
    /// Build a location, dropping a zero line number.
    pub fn new(file: impl Into<String>, line: Option<u32>) -> Self
    {
        Self {
            file: file.into(),
            line: line.filter(|line| *line > 0),
        }
    }

    /// Helper to build a location when only a file is known.
    pub fn from_file(file: impl Into<String>) -> Self
    {
        Self::new(file, None)
    }

    /// Final path component of the file, as shown in rendered traces.
    pub fn basename(&self) -> &str
    {
        self.file.rsplit('/').next().unwrap_or(&self.file)
    }
}
