//! Load-bias derivation from a module file's own segment table.

use std::fs;
use std::path::Path;

use object::{Object, ObjectSegment};

use crate::error::{Result, StackdumpError};

/// Lowest link-time address of any loadable segment of the module at `path`.
///
/// For position-independent objects this is usually `0`; for fixed-address
/// executables it is the address the image was linked at (`0x400000` on
/// x86-64 Linux).
///
/// ## Errors
///
/// Returns an error if the file cannot be read, is not an object file, or has
/// no loadable segments.
pub fn lowest_load_address(path: &Path) -> Result<u64>
{
    let bytes = fs::read(path)?;
    let file = object::File::parse(&*bytes).map_err(|err| StackdumpError::Image {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    file.segments()
        .map(|segment| segment.address())
        .min()
        .ok_or_else(|| StackdumpError::Image {
            path: path.to_path_buf(),
            reason: "no loadable segments".to_string(),
        })
}

/// Load bias of a module whose lowest mapping starts at `mapping_start`.
///
/// The first mapping of an object is its lowest loadable segment rounded down
/// to a page boundary, so `bias = mapping_start - page_floor(lowest vaddr)`.
pub fn load_bias_from_mapping(mapping_start: u64, lowest_vaddr: u64, page_size: u64) -> u64
{
    let page_mask = !(page_size.max(1) - 1);
    mapping_start.wrapping_sub(lowest_vaddr & page_mask)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_position_independent_bias_is_mapping_start()
    {
        assert_eq!(load_bias_from_mapping(0x55d0_c1a0_0000, 0, 0x1000), 0x55d0_c1a0_0000);
    }

    #[test]
    fn test_fixed_address_executable_has_zero_bias()
    {
        assert_eq!(load_bias_from_mapping(0x40_0000, 0x40_0000, 0x1000), 0);
    }

    #[test]
    fn test_unaligned_first_segment_rounds_down()
    {
        assert_eq!(load_bias_from_mapping(0x7f00_0000_0000, 0x1040, 0x1000), 0x7f00_0000_0000 - 0x1000);
    }

    #[test]
    fn test_missing_file_is_an_error()
    {
        assert!(lowest_load_address(Path::new("/definitely/not/here.so")).is_err());
    }
}
