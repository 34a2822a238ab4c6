//! Live introspection: ask the dynamic loader which module holds an address.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use super::maps::ModuleMap;
use super::{ModuleInfo, ModuleLookup};
use crate::error::{Result, StackdumpError};
use crate::platform;
use crate::types::Address;

/// Module resolver backed by the dynamic loader.
///
/// The base is the loader's load bias for the object (the link map's
/// `l_addr`), falling back to `dladdr`'s image base where the program headers
/// cannot be walked. The path is, in order of preference: the loader's object
/// name (or the current executable for the unnamed main program), `dladdr`'s
/// file name, and finally the region listing, if one was supplied.
#[derive(Debug, Clone, Default)]
pub struct LoaderResolver
{
    map: Option<Arc<ModuleMap>>,
}

impl LoaderResolver
{
    #[must_use]
    pub fn new() -> Self
    {
        Self { map: None }
    }

    /// Use `map` to name modules the loader reports without a usable file name.
    #[must_use]
    pub fn with_map(map: Arc<ModuleMap>) -> Self
    {
        Self { map: Some(map) }
    }
}

impl ModuleLookup for LoaderResolver
{
    fn resolve(&self, address: Address) -> Result<ModuleInfo>
    {
        let object = platform::loaded_object_for(address);
        let dl_info = platform::dladdr(address);

        let base = match (&object, &dl_info) {
            (Some(object), _) => object.load_bias,
            (None, Some(info)) if info.file_base != Address::ZERO => info.file_base,
            _ => return Err(StackdumpError::ModuleUnresolved(address)),
        };
        if address < base {
            return Err(StackdumpError::ModuleUnresolved(address));
        }

        let loader_name = match &object {
            Some(object) => match &object.name {
                Some(name) => canonical(name),
                None => std::env::current_exe().ok().and_then(|exe| canonical(&exe)),
            },
            None => None,
        };

        let path = loader_name
            .or_else(|| {
                dl_info
                    .as_ref()
                    .and_then(|info| info.file_name.as_deref())
                    .and_then(|name| canonical(Path::new(name)))
            })
            .or_else(|| {
                self.map
                    .as_ref()
                    .and_then(|map| map.lookup(address))
                    .map(|(path, _)| path.to_path_buf())
            })
            .ok_or(StackdumpError::ModuleUnresolved(address))?;

        trace!(%address, %base, path = %path.display(), "loader resolved module");
        Ok(ModuleInfo { path, base })
    }
}

fn canonical(path: &Path) -> Option<PathBuf>
{
    fs::canonicalize(path).ok()
}
