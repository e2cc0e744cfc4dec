//! Batch Processing Module
//!
//! Image recognition by extension and directory enumeration for the queue.

use crate::common_utils::{has_extension, is_hidden_file};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source extensions accepted for conversion (lowercase, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "tiff", "tif", "bmp", "gif", "heic", "webp", "avif", "jxl",
];

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Regular files under `dir` with one of `extensions`, in walk order.
///
/// Hidden files and hidden directories are skipped.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    walker
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_file(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect()
}

pub fn collect_images(dir: &Path) -> Vec<PathBuf> {
    collect_files(dir, IMAGE_EXTENSIONS, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.PNG")));
        assert!(is_image_file(Path::new("a.heic")));
        assert!(is_image_file(Path::new("a.tif")));
        assert!(!is_image_file(Path::new("a.txt")));
        assert!(!is_image_file(Path::new("png")));
    }

    #[test]
    fn test_collect_images_recursive_skips_hidden() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        let hidden = dir.path().join(".cache");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(&hidden).unwrap();

        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join(".thumb.png"), b"x").unwrap();
        fs::write(nested.join("b.webp"), b"x").unwrap();
        fs::write(hidden.join("c.png"), b"x").unwrap();

        let found = collect_images(dir.path());
        assert_eq!(found, vec![dir.path().join("a.jpg"), nested.join("b.webp")]);
    }

    #[test]
    fn test_collect_files_non_recursive() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.gif"), b"x").unwrap();
        fs::write(nested.join("b.gif"), b"x").unwrap();

        let found = collect_files(dir.path(), &["gif"], false);
        assert_eq!(found, vec![dir.path().join("a.gif")]);
    }
}
