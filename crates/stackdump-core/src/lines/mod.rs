//! # Source Line Resolution
//!
//! Translates module-relative addresses into function names and source
//! locations using the module's debug information.
//!
//! The translation itself is an injectable capability, [`LineTranslator`]:
//! given one module and the addresses requested from it, return exactly one
//! [`LineInfo`] per address, in request order. Two implementations ship with
//! the crate:
//!
//! - [`Addr2LineProcess`]: spawns an external `addr2line` once per module
//! - [`DwarfTranslator`]: reads DWARF in-process with the `addr2line` crate
//!
//! Any closure `Fn(&Path, &[Address]) -> Result<Vec<LineInfo>, TranslatorError>`
//! is also a translator, which keeps tests deterministic.
//!
//! [`SourceLineResolver`] groups a trace's frames by module, calls the
//! translator once per module and merges the answers back into the frames.

use std::path::Path;

use crate::error::TranslatorError;
use crate::types::{Address, SourceLocation};

pub mod dwarf;
pub mod process;
pub mod resolver;

pub use dwarf::DwarfTranslator;
pub use process::Addr2LineProcess;
pub use resolver::SourceLineResolver;

/// Line an external translator prints for an address it knows nothing about.
pub const UNKNOWN_MARKER: &str = "?? ??:0";

/// What a translator knows about one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInfo
{
    /// Function name, already demangled by the translator.
    pub function: Option<String>,
    /// Source location.
    pub location: Option<SourceLocation>,
}

impl LineInfo
{
    /// Nothing known.
    pub fn unknown() -> Self
    {
        Self::default()
    }

    pub fn new(function: Option<String>, location: Option<SourceLocation>) -> Self
    {
        Self { function, location }
    }

    pub fn is_unknown(&self) -> bool
    {
        self.function.is_none() && self.location.is_none()
    }
}

/// Address-to-line translation for a single module.
pub trait LineTranslator
{
    /// Translate `addresses` (module-relative) of the module at `module`.
    ///
    /// ## Errors
    ///
    /// Returns a [`TranslatorError`] when the module cannot be translated at
    /// all; the caller leaves that module's frames without source info.
    fn translate(&self, module: &Path, addresses: &[Address]) -> Result<Vec<LineInfo>, TranslatorError>;
}

impl<F> LineTranslator for F
where
    F: Fn(&Path, &[Address]) -> Result<Vec<LineInfo>, TranslatorError>,
{
    fn translate(&self, module: &Path, addresses: &[Address]) -> Result<Vec<LineInfo>, TranslatorError>
    {
        self(module, addresses)
    }
}

/// Parse one output line of `addr2line -C -f -p`.
///
/// The expected shape is `<function> at <file>:<line>`, optionally followed by
/// ` (discriminator N)`. [`UNKNOWN_MARKER`] and lines that do not have that
/// shape yield [`LineInfo::unknown`], including a line position that is not
/// a number (`name at ??:?`). `??` in the function or file position, and `0`
/// in the line position, mean that part is unknown.
///
/// ```rust
/// use stackdump_core::lines::parse_translator_line;
///
/// let info = parse_translator_line("demo::f2 at /src/demo/main.rs:42");
/// assert_eq!(info.function.as_deref(), Some("demo::f2"));
/// assert_eq!(info.location.unwrap().line, Some(42));
///
/// assert!(parse_translator_line("?? ??:0").is_unknown());
/// ```
pub fn parse_translator_line(line: &str) -> LineInfo
{
    let line = line.trim();
    if line == UNKNOWN_MARKER {
        return LineInfo::unknown();
    }

    let line = match line.find(" (discriminator ") {
        Some(position) => &line[..position],
        None => line,
    };

    let Some((function, location)) = line.split_once(" at ") else {
        return LineInfo::unknown();
    };
    let Some((file, line_number)) = location.rsplit_once(':') else {
        return LineInfo::unknown();
    };
    let line_number = line_number.trim();
    if line_number.is_empty() || !line_number.bytes().all(|byte| byte.is_ascii_digit()) {
        return LineInfo::unknown();
    }

    let function = function.trim();
    let function = (!function.is_empty() && function != "??").then(|| function.to_string());

    let file = file.trim();
    let location = if file.is_empty() || file == "??" {
        None
    } else {
        Some(SourceLocation::new(file, line_number.parse::<u32>().ok()))
    };

    LineInfo::new(function, location)
}

/// Parse the full output of one translator call, one [`LineInfo`] per line.
pub fn parse_translator_output(output: &str) -> Vec<LineInfo>
{
    output.lines().map(parse_translator_line).collect()
}
