//! Build-time schema hash for library databases
//!
//! Hashes the sources that define the on-disk library layout and exports the
//! result as `LIBRARY_SCHEMA_HASH`. At runtime the hash is stored in the
//! `meta` table of each library; opening a library written by a build with a
//! different hash logs a warning.
//!
//! ## Schema-critical files:
//! - src/library.rs: table definitions and row mapping
//! - src/query/fields.rs: SQL column expressions used by queries

use std::fs;

const SCHEMA_CRITICAL_FILES: &[&str] = &["src/library.rs", "src/query/fields.rs"];

fn main() {
    for file in SCHEMA_CRITICAL_FILES {
        println!("cargo:rerun-if-changed={}", file);
    }
    println!("cargo:rustc-env=LIBRARY_SCHEMA_HASH={}", schema_hash());
}

/// Short hex digest over (path, contents) of each file, in path order
fn schema_hash() -> String {
    let mut files = SCHEMA_CRITICAL_FILES.to_vec();
    files.sort_unstable();

    let hasher = files.iter().fold(blake3::Hasher::new(), |mut hasher, file| {
        let content = fs::read(file).unwrap_or_else(|e| panic!("Failed to read {}: {}", file, e));
        hasher.update(file.as_bytes()).update(&content);
        hasher
    });

    hasher.finalize().to_hex()[..16].to_string()
}
