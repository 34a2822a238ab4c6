//! Fixture tests: a known function of this test binary (and of libc) must map
//! to the same module-relative offset through both resolution strategies, and
//! that offset must translate back to the function.

#![cfg(target_os = "linux")]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use stackdump_core::lines::{Addr2LineProcess, DwarfTranslator, LineTranslator};
use stackdump_core::modules::{LoaderResolver, MapResolver, ModuleLookup, ModuleMap};
use stackdump_core::{Address, OffsetCorrection, StackdumpError};

#[inline(never)]
#[no_mangle]
pub extern "C" fn stackdump_fixture_marker() -> u64
{
    std::process::id() as u64
}

fn marker_address() -> Address
{
    Address::new(stackdump_fixture_marker as usize as u64)
}

fn libc_address() -> Address
{
    // SAFETY: the name is NUL-terminated and RTLD_DEFAULT is always valid.
    let pointer = unsafe { libc::dlsym(libc::RTLD_DEFAULT, b"getpid\0".as_ptr().cast()) };
    assert!(!pointer.is_null());
    Address::new(pointer as usize as u64)
}

fn proc_map() -> Arc<ModuleMap>
{
    Arc::new(ModuleMap::from_proc_self().unwrap())
}

fn addr2line_available() -> bool
{
    Command::new("addr2line")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[test]
fn test_live_resolution_of_main_executable()
{
    let info = LoaderResolver::new().resolve(marker_address()).unwrap();
    let exe = std::fs::canonicalize(std::env::current_exe().unwrap()).unwrap();
    assert_eq!(info.path, exe);
    assert!(info.offset_of(marker_address()).is_some());
}

#[test]
fn test_strategies_agree_on_main_executable()
{
    let live = LoaderResolver::new().resolve(marker_address()).unwrap();
    let maps = MapResolver::new(proc_map(), OffsetCorrection::ElfLoadBias)
        .resolve(marker_address())
        .unwrap();

    assert_eq!(live.path, maps.path);
    assert_eq!(live.base, maps.base);
    assert_eq!(live.offset_of(marker_address()), maps.offset_of(marker_address()));
}

#[test]
fn test_strategies_agree_on_shared_library()
{
    let address = libc_address();
    let live = LoaderResolver::new().resolve(address).unwrap();
    let maps = MapResolver::new(proc_map(), OffsetCorrection::ElfLoadBias)
        .resolve(address)
        .unwrap();

    assert_eq!(live.path, maps.path);
    assert_eq!(live.offset_of(address), maps.offset_of(address));
}

#[test]
fn test_unmapped_address_is_unresolved()
{
    let address = Address::new(0x10);
    let live = LoaderResolver::new().resolve(address).unwrap_err();
    assert!(matches!(live, StackdumpError::ModuleUnresolved(_)));

    let maps = MapResolver::new(proc_map(), OffsetCorrection::ElfLoadBias)
        .resolve(address)
        .unwrap_err();
    assert!(matches!(maps, StackdumpError::ModuleUnresolved(_)));
}

#[test]
fn test_map_path_fallback_for_loader()
{
    let map = proc_map();
    let info = LoaderResolver::with_map(Arc::clone(&map)).resolve(marker_address()).unwrap();
    let (path, _) = map.lookup(marker_address()).unwrap();
    assert_eq!(info.path, PathBuf::from(path));
}

#[test]
fn test_offset_translates_back_in_process()
{
    let info = LoaderResolver::new().resolve(marker_address()).unwrap();
    let offset = info.offset_of(marker_address()).unwrap();

    let infos = DwarfTranslator::new()
        .translate(&info.path, &[Address::new(offset)])
        .unwrap();
    assert_eq!(infos.len(), 1);
    let function = infos[0].function.as_deref().unwrap();
    assert!(function.contains("stackdump_fixture_marker"), "got {function}");
    assert!(infos[0].location.as_ref().unwrap().file.ends_with("modules.rs"));
}

#[test]
fn test_map_offset_translates_back_in_process()
{
    let info = MapResolver::new(proc_map(), OffsetCorrection::ElfLoadBias)
        .resolve(marker_address())
        .unwrap();
    let offset = info.offset_of(marker_address()).unwrap();

    let infos = DwarfTranslator::new()
        .translate(&info.path, &[Address::new(offset)])
        .unwrap();
    let function = infos[0].function.as_deref().unwrap();
    assert!(function.contains("stackdump_fixture_marker"), "got {function}");
}

fn assert_addr2line_names_marker(offset: u64, module: &Path)
{
    let infos = Addr2LineProcess::default()
        .translate(module, &[Address::new(offset)])
        .unwrap();
    assert_eq!(infos.len(), 1);
    let function = infos[0].function.as_deref().unwrap_or("<none>");
    assert!(function.contains("stackdump_fixture_marker"), "got {function}");
    let location = infos[0].location.as_ref().expect("addr2line gave no location");
    assert!(location.file.ends_with("modules.rs"), "got {}", location.file);
    assert!(location.line.is_some());
}

#[test]
fn test_offset_translates_back_through_addr2line()
{
    if !addr2line_available() {
        return;
    }

    let info = LoaderResolver::new().resolve(marker_address()).unwrap();
    let offset = info.offset_of(marker_address()).unwrap();
    assert_addr2line_names_marker(offset, &info.path);
}

#[test]
fn test_map_offset_translates_back_through_addr2line()
{
    if !addr2line_available() {
        return;
    }

    let info = MapResolver::new(proc_map(), OffsetCorrection::ElfLoadBias)
        .resolve(marker_address())
        .unwrap();
    let offset = info.offset_of(marker_address()).unwrap();
    assert_addr2line_names_marker(offset, &info.path);
}
