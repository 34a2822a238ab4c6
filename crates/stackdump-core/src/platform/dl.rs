use std::ffi::{c_void, CStr};
use std::mem::MaybeUninit;

use super::DlInfo;
use crate::types::Address;

fn owned_c_string(ptr: *const libc::c_char) -> Option<String>
{
    if ptr.is_null() {
        return None;
    }
    // SAFETY: the loader hands out NUL-terminated strings that stay valid while
    // the object is loaded; we copy them out immediately.
    let value = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
    (!value.is_empty()).then_some(value)
}

pub(super) fn dladdr(address: Address) -> Option<DlInfo>
{
    let mut info = MaybeUninit::<libc::Dl_info>::zeroed();
    // SAFETY: `dladdr` only inspects the address value, it never dereferences it.
    let ok = unsafe { libc::dladdr(address.value() as usize as *const c_void, info.as_mut_ptr()) };
    if ok == 0 {
        return None;
    }

    // SAFETY: a nonzero return means `info` was filled in.
    let info = unsafe { info.assume_init() };
    let symbol_address = (!info.dli_saddr.is_null()).then(|| Address::from(info.dli_saddr as usize as u64));

    Some(DlInfo {
        file_name: owned_c_string(info.dli_fname),
        file_base: Address::from(info.dli_fbase as usize as u64),
        symbol_name: owned_c_string(info.dli_sname),
        symbol_address,
    })
}

pub(super) fn page_size() -> u64
{
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}
