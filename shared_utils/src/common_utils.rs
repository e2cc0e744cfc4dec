//! Common Utilities Module
//!
//! Small path helpers shared by file collection and the conversion engine.

use std::path::Path;

/// Lowercased extension, or an empty string when there is none.
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension membership test. `extensions` are lowercase, no dot.
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// assert!(has_extension(Path::new("photo.HEIC"), &["heic", "png"]));
/// assert!(!has_extension(Path::new("clip.mp4"), &["heic", "png"]));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

/// Dotfiles such as `.DS_Store` or `._photo.jpg`.
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// File name for messages, falling back to the whole path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
