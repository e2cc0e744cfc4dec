//! Output naming
//!
//! `<source dir>/<stem><suffix>.<ext>`. Pure: the same inputs always give the
//! same path, and nothing is read from disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub fn output_path(source: &Path, suffix: &str, target_ext: &str) -> PathBuf {
    let mut name = OsString::new();
    if let Some(stem) = source.file_stem() {
        name.push(stem);
    }
    name.push(suffix);
    if !target_ext.is_empty() {
        name.push(".");
        name.push(target_ext);
    }

    match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
