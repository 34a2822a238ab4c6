//! # Trace Formatter
//!
//! Renders a [`Trace`] as plain text, one line per frame:
//!
//! ```text
//! #0 0x1a2b3 demo::f2 (main.rs:42)
//! #1 0x1a300 demo::f1 (main.rs:37)
//! #2 0x7f3c2a1b2c3d
//! ```
//!
//! The address column shows the module-relative offset when the frame's
//! module is known and the raw address otherwise. The symbol is omitted when
//! unknown, and the parenthesised location only appears when a line number is
//! known. Rendering is a pure function of the frames.

use std::fmt::Write as _;
use std::path::Path;

use crate::types::{Frame, Trace};

/// Render a trace with the default layout.
///
/// ## Example
///
/// ```rust
/// use stackdump_core::format::render;
/// use stackdump_core::types::{Address, Frame, SourceLocation, SymbolName, Trace};
///
/// let trace = Trace::from_frames(vec![Frame::new(0, Address::new(0x5555_0000_1234))
///     .with_module("/usr/bin/demo", 0x1234)
///     .with_symbol(SymbolName::display_only("f2"))
///     .with_location(SourceLocation::new("/src/demo/main.rs", Some(7)))]);
///
/// assert_eq!(render(&trace), "#0 0x1234 f2 (main.rs:7)\n");
/// ```
pub fn render(trace: &Trace) -> String
{
    TraceFormatter::default().render(trace)
}

/// Configurable renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceFormatter
{
    /// Prefix offsets with the module's file name, as in `libc.so.6(+0x29d90)`.
    pub show_module: bool,
}

impl TraceFormatter
{
    #[must_use]
    pub fn with_module(mut self, show_module: bool) -> Self
    {
        self.show_module = show_module;
        self
    }

    pub fn render(&self, trace: &Trace) -> String
    {
        let mut out = String::new();
        for frame in trace {
            self.render_frame(&mut out, frame);
            out.push('\n');
        }
        out
    }

    /// Render a single frame without the trailing newline.
    pub fn render_frame(&self, out: &mut String, frame: &Frame)
    {
        let _ = write!(out, "#{} ", frame.index);

        match &frame.module {
            Some(module) if self.show_module => {
                let name = module_basename(&module.path);
                let _ = write!(out, "{name}(+0x{:x})", module.offset);
            }
            Some(module) => {
                let _ = write!(out, "0x{:x}", module.offset);
            }
            None => {
                let _ = write!(out, "{}", frame.raw_address);
            }
        }

        if let Some(symbol) = frame.symbol_name().filter(|name| !name.is_empty()) {
            out.push(' ');
            out.push_str(symbol);
        }

        if let (Some(location), Some(line)) = (&frame.location, frame.source_line()) {
            let _ = write!(out, " ({}:{line})", location.basename());
        }
    }
}

fn module_basename(path: &Path) -> String
{
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
