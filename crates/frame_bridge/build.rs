// build.rs
// Build script for locating the native rendering library

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=FRAME_BRIDGE_NATIVE_LIB_DIR");

    // Nothing to link unless the FFI engine is compiled in
    if env::var_os("CARGO_FEATURE_NATIVE_FFI").is_none() {
        return;
    }

    let lib_dir = match env::var("FRAME_BRIDGE_NATIVE_LIB_DIR") {
        Ok(dir) => dir,
        Err(_) => {
            println!("cargo:warning=FRAME_BRIDGE_NATIVE_LIB_DIR not set, relying on the system linker path");
            println!("cargo:warning=hint: point it at the directory containing librendering");
            return;
        }
    };

    if !Path::new(&lib_dir).is_dir() {
        println!("cargo:warning=FRAME_BRIDGE_NATIVE_LIB_DIR does not exist: {}", lib_dir);
        return;
    }

    println!("cargo:rustc-link-search=native={}", lib_dir);
    println!("cargo:rerun-if-changed={}", lib_dir);
}
