use std::ffi::{c_void, CStr};
use std::path::PathBuf;

use super::LoadedObject;
use crate::types::Address;

struct PhdrSearch
{
    target: u64,
    found: Option<LoadedObject>,
}

unsafe extern "C" fn visit_object(info: *mut libc::dl_phdr_info, _size: libc::size_t, data: *mut c_void) -> libc::c_int
{
    let search = &mut *(data as *mut PhdrSearch);
    let info = &*info;
    if info.dlpi_phdr.is_null() {
        return 0;
    }

    let bias = info.dlpi_addr as u64;
    let headers = std::slice::from_raw_parts(info.dlpi_phdr, info.dlpi_phnum as usize);
    let contains = headers.iter().filter(|header| header.p_type == libc::PT_LOAD).any(|header| {
        let start = bias.wrapping_add(header.p_vaddr as u64);
        let end = start.wrapping_add(header.p_memsz as u64);
        search.target >= start && search.target < end
    });
    if !contains {
        return 0;
    }

    let name = if info.dlpi_name.is_null() {
        None
    } else {
        let name = CStr::from_ptr(info.dlpi_name).to_string_lossy().into_owned();
        (!name.is_empty()).then(|| PathBuf::from(name))
    };
    search.found = Some(LoadedObject {
        name,
        load_bias: Address::from(bias),
    });

    // Nonzero stops the iteration.
    1
}

pub(super) fn loaded_object_for(address: Address) -> Option<LoadedObject>
{
    let mut search = PhdrSearch {
        target: address.value(),
        found: None,
    };
    // SAFETY: the callback only reads the loader-provided headers during the
    // call and writes through `data`, which points at `search` for its duration.
    unsafe {
        libc::dl_iterate_phdr(Some(visit_object), &mut search as *mut PhdrSearch as *mut c_void);
    }
    search.found
}
