use std::{env, fs, path::PathBuf};

// Stages the SDL files under OUT_DIR so the registry can embed them with
// `include_str!` regardless of where the crate is built from.
fn main() {
    println!("cargo:rerun-if-changed=schemas");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let out_schemas = out_dir.join("schemas");
    println!("cargo:rustc-env=OUT_SCHEMAS={}", out_schemas.display());
    fs::create_dir_all(&out_schemas).expect("create schema output directory");

    let entries = fs::read_dir("schemas").expect("read schemas directory");
    for entry in entries {
        let path = entry.expect("read schema entry").path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("graphql") {
            continue;
        }
        if let Some(file_name) = path.file_name() {
            fs::copy(&path, out_schemas.join(file_name)).expect("copy schema file");
        }
    }
}
