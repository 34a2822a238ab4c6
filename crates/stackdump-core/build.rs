//! Build script for stackdump-core
//!
//! This script checks system requirements before compilation:
//! - Minimum Rust version (`let ... else` and `OnceCell` helpers need Rust 1.65.0+)
//! - Platform support (the capture path needs a unix dynamic loader)
//!
//! ## Requirements
//!
//! - **Rust**: 1.65.0 or newer
//! - **Linux**: full support (`dladdr`, `dl_iterate_phdr`, `/proc/self/maps`)
//! - **macOS**: loader introspection only (no region listing fallback)
//! - **Windows**: not supported (captures degrade to raw addresses)

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 65, 0);

        if rustc_version < min_rust_version {
            panic!(
                "stackdump-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    let target_family = std::env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    if !target_family.split(',').any(|family| family == "unix") {
        println!("cargo:warning=stackdump-core: non-unix target, module and symbol resolution are disabled");
    }
}
