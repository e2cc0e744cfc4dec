use std::borrow::Cow;
use std::path::Path;

/// Renders a path as a command-line argument that can never be read as a flag.
///
/// Encoders like cwebp and gifsicle have no `--` delimiter, so a relative path
/// starting with '-' gets a `./` prefix.
pub fn safe_path_arg(path: &Path) -> Cow<'_, str> {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        Cow::Owned(format!("./{}", s))
    } else {
        s
    }
}
