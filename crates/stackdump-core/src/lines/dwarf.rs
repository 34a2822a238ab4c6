//! In-process translator reading DWARF with the `addr2line` crate.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use tracing::debug;

use super::{LineInfo, LineTranslator};
use crate::error::TranslatorError;
use crate::symbols::demangle;
use crate::types::{Address, SourceLocation};

type Reader = EndianArcSlice<RunTimeEndian>;

/// Translator that never leaves the process.
///
/// Each module's debug information is parsed on first use and kept for the
/// translator's lifetime. Addresses are link-time addresses, which is what
/// `raw_address - load_bias` yields.
#[derive(Default)]
pub struct DwarfTranslator
{
    contexts: RefCell<HashMap<PathBuf, Rc<Context<Reader>>>>,
}

impl DwarfTranslator
{
    pub fn new() -> Self
    {
        Self::default()
    }

    fn context(&self, module: &Path) -> Result<Rc<Context<Reader>>, TranslatorError>
    {
        if let Some(context) = self.contexts.borrow().get(module) {
            return Ok(Rc::clone(context));
        }

        let context = Rc::new(load_context(module)?);
        self.contexts
            .borrow_mut()
            .insert(module.to_path_buf(), Rc::clone(&context));
        debug!(module = %module.display(), "loaded debug information");
        Ok(context)
    }
}

impl std::fmt::Debug for DwarfTranslator
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DwarfTranslator")
            .field("modules", &self.contexts.borrow().len())
            .finish()
    }
}

impl LineTranslator for DwarfTranslator
{
    fn translate(&self, module: &Path, addresses: &[Address]) -> Result<Vec<LineInfo>, TranslatorError>
    {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let context = self.context(module)?;
        Ok(addresses
            .iter()
            .map(|address| lookup(&context, address.value()))
            .collect())
    }
}

fn image_error(module: &Path, reason: impl ToString) -> TranslatorError
{
    TranslatorError::Image {
        module: module.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn load_context(module: &Path) -> Result<Context<Reader>, TranslatorError>
{
    let bytes = fs::read(module).map_err(|err| image_error(module, err))?;
    let file = object::File::parse(&*bytes).map_err(|err| image_error(module, err))?;
    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let dwarf = Dwarf::load(|id| load_section(&file, id, endian)).map_err(|err| image_error(module, err))?;
    Context::from_dwarf(dwarf).map_err(|err| image_error(module, err))
}

fn load_section(file: &object::File<'_>, id: SectionId, endian: RunTimeEndian) -> Result<Reader, object::Error>
{
    let name = id.name();
    // Mach-O spells `.debug_info` as `__debug_info`.
    let macho_name = format!("__{}", name.trim_start_matches('.'));

    let section = file
        .section_by_name(name)
        .or_else(|| file.section_by_name(&macho_name));
    let data: Arc<[u8]> = match section {
        Some(section) => match section.uncompressed_data()? {
            Cow::Borrowed(bytes) => Arc::from(bytes),
            Cow::Owned(bytes) => bytes.into(),
        },
        None => Arc::from(Vec::new()),
    };

    Ok(EndianArcSlice::new(data, endian))
}

fn lookup(context: &Context<Reader>, address: u64) -> LineInfo
{
    let mut frames = match context.find_frames(address).skip_all_loads() {
        Ok(frames) => frames,
        Err(_) => return LineInfo::unknown(),
    };

    // The first frame is the innermost (possibly inlined) function, which is
    // what the external translator reports without `-i`.
    match frames.next() {
        Ok(Some(frame)) => {
            let function = frame
                .function
                .as_ref()
                .and_then(|function| function.raw_name().ok())
                .map(|raw| demangle(&raw));
            let location = frame
                .location
                .and_then(|location| location.file.map(|file| SourceLocation::new(file, location.line)));
            LineInfo::new(function, location)
        }
        _ => match context.find_location(address) {
            Ok(Some(location)) => LineInfo::new(
                None,
                location.file.map(|file| SourceLocation::new(file, location.line)),
            ),
            _ => LineInfo::unknown(),
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_missing_module_is_an_image_error()
    {
        let translator = DwarfTranslator::new();
        let err = translator
            .translate(Path::new("/definitely/not/here"), &[Address::from(0x1000_u64)])
            .unwrap_err();
        assert!(matches!(err, TranslatorError::Image { .. }));
    }

    #[test]
    fn test_empty_request_does_not_open_the_module()
    {
        let translator = DwarfTranslator::new();
        assert!(translator.translate(Path::new("/definitely/not/here"), &[]).unwrap().is_empty());
    }
}
