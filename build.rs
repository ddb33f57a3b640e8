//! Generates the table of license records compiled into the binary from
//! every `data/licenses/<id>.json` file.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("licenses");
    println!("cargo:rerun-if-changed={}", data_dir.display());

    let mut ids: Vec<String> = fs::read_dir(&data_dir)
        .expect("data/licenses is readable")
        .map(|entry| entry.expect("data/licenses entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
        .collect();
    // Sorted so the table can be binary searched.
    ids.sort();

    let mut table = String::from("&[\n");
    for id in &ids {
        let path = data_dir.join(format!("{}.json", id));
        writeln!(
            table,
            "    ({:?}, include_str!({:?})),",
            id,
            path.to_string_lossy()
        )
        .expect("write to String");
    }
    table.push_str("]\n");

    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set")).join("bundled_licenses.rs");
    fs::write(out, table).expect("bundled_licenses.rs is writable");
}
