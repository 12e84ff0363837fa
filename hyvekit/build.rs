//! Locate the vendored libxhyve when the FFI backend is enabled.
//!
//! `XHYVE_LIB_DIR` wins; otherwise pkg-config is asked for `xhyve`. The
//! library itself is linked by the `#[link]` attribute in the backend.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=XHYVE_LIB_DIR");

    let wants_xhyve = env::var_os("CARGO_FEATURE_XHYVE_BACKEND").is_some();
    let is_macos = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "macos");
    if !wants_xhyve || !is_macos {
        return;
    }

    if let Ok(dir) = env::var("XHYVE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
        return;
    }

    match pkg_config::Config::new().cargo_metadata(false).probe("xhyve") {
        Ok(library) => {
            for path in library.link_paths {
                println!("cargo:rustc-link-search=native={}", path.display());
            }
        }
        Err(e) => {
            println!("cargo:warning=libxhyve not found via pkg-config ({e}); set XHYVE_LIB_DIR");
        }
    }
}
