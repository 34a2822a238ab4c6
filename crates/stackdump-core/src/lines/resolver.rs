//! Batched, per-module source line resolution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::{LineInfo, LineTranslator};
use crate::types::{Address, Frame, SymbolName};

/// Fills in source locations by calling a [`LineTranslator`] once per module.
///
/// Frames are grouped by module path; within a group, addresses keep the
/// order in which the frames appear. The translator's `i`-th answer for a
/// module belongs to that module's `i`-th address. Frames without a module
/// are never sent to the translator.
pub struct SourceLineResolver<'a>
{
    translator: &'a dyn LineTranslator,
}

impl<'a> SourceLineResolver<'a>
{
    pub fn new(translator: &'a dyn LineTranslator) -> Self
    {
        Self { translator }
    }

    /// Resolve source lines for `frames`, returning them in the same order.
    ///
    /// A module whose translation fails keeps its frames as they were; other
    /// modules are unaffected. A translated function name replaces the
    /// frame's symbol.
    pub fn resolve_lines(&self, mut frames: Vec<Frame>) -> Vec<Frame>
    {
        for (module, positions) in group_by_module(&frames) {
            let addresses: Vec<Address> = positions
                .iter()
                .filter_map(|&position| frames[position].module_relative_offset())
                .map(Address::from)
                .collect();

            let infos = match self.translator.translate(&module, &addresses) {
                Ok(infos) => infos,
                Err(err) => {
                    warn!(module = %module.display(), "source lines unavailable: {err}");
                    continue;
                }
            };

            if infos.len() != addresses.len() {
                warn!(
                    module = %module.display(),
                    requested = addresses.len(),
                    received = infos.len(),
                    "translator answered a different number of addresses"
                );
            }
            debug!(module = %module.display(), addresses = addresses.len(), "resolved source lines");

            for (&position, info) in positions.iter().zip(infos) {
                apply(&mut frames[position], info);
            }
        }

        frames
    }
}

/// Frame positions per module path, in frame order.
fn group_by_module(frames: &[Frame]) -> BTreeMap<PathBuf, Vec<usize>>
{
    let mut groups: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
    for (position, frame) in frames.iter().enumerate() {
        if let Some(module) = &frame.module {
            groups.entry(module.path.clone()).or_default().push(position);
        }
    }
    groups
}

fn apply(frame: &mut Frame, info: LineInfo)
{
    if info.is_unknown() {
        return;
    }
    if let Some(function) = info.function {
        frame.symbol = Some(SymbolName::display_only(function));
    }
    if let Some(location) = info.location {
        frame.location = Some(location);
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;
    use crate::error::TranslatorError;
    use crate::types::SourceLocation;

    fn frame(index: usize, module: &str, offset: u64) -> Frame
    {
        Frame::new(index, Address::from(0x5000_0000 + offset)).with_module(module, offset)
    }

    #[test]
    fn test_one_call_per_module()
    {
        let calls = RefCell::new(Vec::new());
        let translator = |module: &Path, addresses: &[Address]| -> Result<Vec<LineInfo>, TranslatorError> {
            calls.borrow_mut().push((module.to_path_buf(), addresses.to_vec()));
            Ok(addresses.iter().map(|_| LineInfo::unknown()).collect())
        };

        let frames = vec![
            frame(0, "/a", 0x10),
            frame(1, "/b", 0x20),
            frame(2, "/a", 0x30),
            Frame::new(3, Address::from(0x9_u64)),
        ];
        SourceLineResolver::new(&translator).resolve_lines(frames);

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (PathBuf::from("/a"), vec![Address::from(0x10_u64), Address::from(0x30_u64)]));
        assert_eq!(calls[1], (PathBuf::from("/b"), vec![Address::from(0x20_u64)]));
    }

    #[test]
    fn test_short_answer_leaves_the_tail_unresolved()
    {
        let translator = |_: &Path, _: &[Address]| -> Result<Vec<LineInfo>, TranslatorError> {
            Ok(vec![LineInfo::new(Some("first".to_string()), Some(SourceLocation::new("a.rs", Some(1))))])
        };

        let frames = SourceLineResolver::new(&translator).resolve_lines(vec![frame(0, "/a", 0x10), frame(1, "/a", 0x20)]);
        assert_eq!(frames[0].symbol_name(), Some("first"));
        assert_eq!(frames[1].symbol_name(), None);
        assert_eq!(frames[1].source_file(), None);
    }

    #[test]
    fn test_failure_keeps_existing_symbol()
    {
        let translator = |module: &Path, _: &[Address]| -> Result<Vec<LineInfo>, TranslatorError> {
            Err(TranslatorError::Image {
                module: module.to_path_buf(),
                reason: "no debug info".to_string(),
            })
        };

        let frames = vec![frame(0, "/a", 0x10).with_symbol(SymbolName::display_only("exported"))];
        let frames = SourceLineResolver::new(&translator).resolve_lines(frames);
        assert_eq!(frames[0].symbol_name(), Some("exported"));
        assert_eq!(frames[0].source_file(), None);
    }
}
