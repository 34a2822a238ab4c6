//! Memory-map fallback: interval lookup in a parsed region listing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::image::{load_bias_from_mapping, lowest_load_address};
use super::maps::{ModuleMap, ModuleRange};
use super::{ModuleInfo, ModuleLookup, OffsetCorrection};
use crate::error::{Result, StackdumpError};
use crate::platform;
use crate::types::Address;

/// Module resolver backed by a [`ModuleMap`] snapshot.
///
/// Per-module load biases are derived once and remembered for the resolver's
/// lifetime, which is a single trace.
#[derive(Debug)]
pub struct MapResolver
{
    map: Arc<ModuleMap>,
    correction: OffsetCorrection,
    page_size: u64,
    biases: RefCell<HashMap<PathBuf, Address>>,
}

impl MapResolver
{
    pub fn new(map: Arc<ModuleMap>, correction: OffsetCorrection) -> Self
    {
        Self {
            map,
            correction,
            page_size: platform::page_size(),
            biases: RefCell::new(HashMap::new()),
        }
    }

    pub fn map(&self) -> &ModuleMap
    {
        &self.map
    }

    fn base_for(&self, path: &Path, range: ModuleRange) -> Address
    {
        match self.correction {
            OffsetCorrection::MappingStart => range.start,
            OffsetCorrection::ElfLoadBias => {
                if let Some(bias) = self.biases.borrow().get(path) {
                    return *bias;
                }
                let bias = match lowest_load_address(path) {
                    Ok(lowest) => Address::from(load_bias_from_mapping(range.start.value(), lowest, self.page_size)),
                    Err(err) => {
                        debug!(path = %path.display(), "falling back to mapping start: {err}");
                        range.start
                    }
                };
                self.biases.borrow_mut().insert(path.to_path_buf(), bias);
                bias
            }
        }
    }
}

impl ModuleLookup for MapResolver
{
    fn resolve(&self, address: Address) -> Result<ModuleInfo>
    {
        let (path, range) = self
            .map
            .lookup(address)
            .ok_or(StackdumpError::ModuleUnresolved(address))?;
        let base = self.base_for(path, range);
        if address < base {
            return Err(StackdumpError::ModuleUnresolved(address));
        }

        Ok(ModuleInfo {
            path: path.to_path_buf(),
            base,
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn map() -> Arc<ModuleMap>
    {
        Arc::new(
            ModuleMap::parse(
                "\
7f10aa000000-7f10aa028000 r--p 00000000 08:01 200 /nonexistent/libfake.so
7f10aa028000-7f10aa1bd000 r-xp 00028000 08:01 200 /nonexistent/libfake.so
",
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_mapping_start_correction()
    {
        let resolver = MapResolver::new(map(), OffsetCorrection::MappingStart);
        let info = resolver.resolve(Address::from(0x7f10_aa03_1234_u64)).unwrap();
        assert_eq!(info.path, PathBuf::from("/nonexistent/libfake.so"));
        assert_eq!(info.offset_of(Address::from(0x7f10_aa03_1234_u64)), Some(0x31234));
    }

    #[test]
    fn test_unreadable_module_falls_back_to_mapping_start()
    {
        let resolver = MapResolver::new(map(), OffsetCorrection::ElfLoadBias);
        let info = resolver.resolve(Address::from(0x7f10_aa03_1234_u64)).unwrap();
        assert_eq!(info.base, Address::from(0x7f10_aa00_0000_u64));
    }

    #[test]
    fn test_address_outside_every_module()
    {
        let resolver = MapResolver::new(map(), OffsetCorrection::MappingStart);
        let err = resolver.resolve(Address::from(0x1000_u64)).unwrap_err();
        assert!(matches!(err, StackdumpError::ModuleUnresolved(_)));
    }
}
