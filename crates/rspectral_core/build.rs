use std::env;
use std::fs;
use std::path::PathBuf;

const PLACEHOLDER: &str = "throw new Error('rspectral bundle not built: run `npm run build` in bundle/ or set RSPECTRAL_DIST');\n";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RSPECTRAL_DIST");
    println!("cargo::rustc-check-cfg=cfg(rspectral_bundle)");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out = PathBuf::from(env::var("OUT_DIR").unwrap()).join("built.js");

    let bundle = match env::var_os("RSPECTRAL_DIST") {
        Some(path) => PathBuf::from(path),
        None => manifest_dir.join("../../bundle/dist/built.js"),
    };
    println!("cargo:rerun-if-changed={}", bundle.display());

    if bundle.is_file() {
        fs::copy(&bundle, &out).expect("failed to copy the bundle into OUT_DIR");
        println!("cargo:rustc-cfg=rspectral_bundle");
    } else {
        fs::write(&out, PLACEHOLDER).expect("failed to write the placeholder bundle");
    }
}
