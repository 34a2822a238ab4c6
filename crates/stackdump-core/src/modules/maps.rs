//! Memory mapping utilities for the memory-map fallback strategy
//!
//! This module parses the process's own region listing (`/proc/self/maps`)
//! into a [`ModuleMap`]: one covering `[start, end)` range per mapped file,
//! coalesced from all of that file's regions.
//!
//! Each listing line looks like:
//!
//! ```text
//! 7f1c2a600000-7f1c2a628000 r--p 00000000 08:01 1835081    /usr/lib/x86_64-linux-gnu/libc.so.6
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StackdumpError};
use crate::types::Address;

/// Location of the live region listing of the calling process.
pub const PROC_SELF_MAPS: &str = "/proc/self/maps";

const DELETED_SUFFIX: &str = " (deleted)";

/// Address range covered by one module, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRange
{
    pub start: Address,
    pub end: Address,
}

impl ModuleRange
{
    /// Check if an address falls within this range
    #[must_use]
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }

    fn widen(&mut self, start: Address, end: Address)
    {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
    }
}

/// Snapshot of which file is mapped where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMap
{
    modules: BTreeMap<PathBuf, ModuleRange>,
}

impl ModuleMap
{
    /// Read and parse the calling process's own region listing.
    ///
    /// ## Errors
    ///
    /// Returns an error if the listing cannot be read (non-Linux systems have
    /// none) or contains a malformed address range.
    pub fn from_proc_self() -> Result<Self>
    {
        let text = fs::read_to_string(PROC_SELF_MAPS)?;
        let map = Self::parse(&text)?;
        debug!(modules = map.len(), "parsed {PROC_SELF_MAPS}");
        Ok(map)
    }

    /// Parse region listing text.
    ///
    /// Lines without a path, anonymous regions and pseudo regions such as
    /// `[stack]` or `[vdso]` are skipped: they are not files a translator
    /// could open. Multiple regions of the same file are coalesced into the
    /// range from the lowest start to the highest end.
    ///
    /// ## Errors
    ///
    /// Returns [`StackdumpError::MemoryMap`] if a line's address range is not
    /// of the form `<hex>-<hex>` with `start <= end`.
    pub fn parse(text: &str) -> Result<Self>
    {
        let mut modules: BTreeMap<PathBuf, ModuleRange> = BTreeMap::new();

        for (number, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                continue;
            }

            let path = fields[5..].join(" ");
            let path = path.strip_suffix(DELETED_SUFFIX).unwrap_or(&path);
            if !path.starts_with('/') {
                continue;
            }

            let (start, end) = parse_range(fields[0])
                .ok_or_else(|| StackdumpError::MemoryMap(format!("line {}: bad address range {:?}", number + 1, fields[0])))?;

            modules
                .entry(PathBuf::from(path))
                .and_modify(|range| range.widen(start, end))
                .or_insert(ModuleRange { start, end });
        }

        Ok(Self { modules })
    }

    /// Find the module whose covering range contains `address`.
    ///
    /// Coalesced ranges can overlap when one object is mapped inside a gap of
    /// another; the range with the highest start wins.
    pub fn lookup(&self, address: Address) -> Option<(&Path, ModuleRange)>
    {
        self.modules
            .iter()
            .filter(|(_, range)| range.contains(address))
            .max_by_key(|(_, range)| range.start)
            .map(|(path, range)| (path.as_path(), *range))
    }

    /// Covering range of a module by path.
    pub fn get(&self, path: &Path) -> Option<ModuleRange>
    {
        self.modules.get(path).copied()
    }

    pub fn len(&self) -> usize
    {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, ModuleRange)>
    {
        self.modules.iter().map(|(path, range)| (path.as_path(), *range))
    }
}

fn parse_range(field: &str) -> Option<(Address, Address)>
{
    let (start, end) = field.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    (start <= end).then(|| (Address::from(start), Address::from(end)))
}

#[cfg(test)]
mod tests
{
    use super::*;

    const LISTING: &str = "\
55d0c1a00000-55d0c1a02000 r--p 00000000 08:01 131 /usr/bin/demo
55d0c1a02000-55d0c1a05000 r-xp 00002000 08:01 131 /usr/bin/demo
55d0c1a05000-55d0c1a06000 rw-p 00005000 08:01 131 /usr/bin/demo
55d0c2000000-55d0c2021000 rw-p 00000000 00:00 0          [heap]
7f10aa000000-7f10aa028000 r--p 00000000 08:01 200 /usr/lib/libc.so.6
7f10aa028000-7f10aa1bd000 r-xp 00028000 08:01 200 /usr/lib/libc.so.6
7f10aa300000-7f10aa301000 rw-p 00000000 00:00 0
7ffd1b5f0000-7ffd1b5f2000 r-xp 00000000 00:00 0          [vdso]
";

    #[test]
    fn test_memory_range_contains()
    {
        let range = ModuleRange {
            start: Address::from(0x1000_u64),
            end: Address::from(0x2000_u64),
        };

        assert!(range.contains(Address::from(0x1000_u64)));
        assert!(range.contains(Address::from(0x1FFF_u64)));
        assert!(!range.contains(Address::from(0x0FFF_u64)));
        assert!(!range.contains(Address::from(0x2000_u64)));
    }

    #[test]
    fn test_regions_are_coalesced_per_path()
    {
        let map = ModuleMap::parse(LISTING).unwrap();
        assert_eq!(map.len(), 2);

        let demo = map.get(Path::new("/usr/bin/demo")).unwrap();
        assert_eq!(demo.start, Address::from(0x55d0_c1a0_0000_u64));
        assert_eq!(demo.end, Address::from(0x55d0_c1a0_6000_u64));
    }

    #[test]
    fn test_pseudo_and_anonymous_regions_are_skipped()
    {
        let map = ModuleMap::parse(LISTING).unwrap();
        assert!(map.lookup(Address::from(0x7ffd_1b5f_0100_u64)).is_none());
        assert!(map.lookup(Address::from(0x55d0_c200_0100_u64)).is_none());
    }

    #[test]
    fn test_lookup_by_containment()
    {
        let map = ModuleMap::parse(LISTING).unwrap();
        let (path, range) = map.lookup(Address::from(0x7f10_aa03_0000_u64)).unwrap();
        assert_eq!(path, Path::new("/usr/lib/libc.so.6"));
        assert_eq!(range.start, Address::from(0x7f10_aa00_0000_u64));
    }

    #[test]
    fn test_deleted_suffix_is_stripped()
    {
        let map = ModuleMap::parse("1000-2000 r-xp 00000000 08:01 7 /tmp/old.so (deleted)\n").unwrap();
        assert!(map.get(Path::new("/tmp/old.so")).is_some());
    }

    #[test]
    fn test_malformed_range_is_an_error()
    {
        let err = ModuleMap::parse("zzzz-2000 r-xp 00000000 08:01 7 /tmp/x.so\n").unwrap_err();
        assert!(matches!(err, StackdumpError::MemoryMap(_)));
    }
}
