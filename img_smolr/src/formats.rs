//! Output format catalogue
//!
//! `ImageFormat` is an encodable target; `OutputFormat` adds the "keep the
//! source format" choice offered to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use shared_utils::app_error::AppError;
use shared_utils::common_utils::get_extension_lowercase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Avif,
    Jxl,
}

impl ImageFormat {
    /// Case-insensitive; `jpg` and `jpeg` are the same format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            "avif" => Some(ImageFormat::Avif),
            "jxl" => Some(ImageFormat::Jxl),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(&get_extension_lowercase(path))
    }

    /// Extension written for a converted file, also the format's settings id.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Jxl => "jxl",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Gif => "GIF",
            ImageFormat::Webp => "WebP",
            ImageFormat::Avif => "AVIF",
            ImageFormat::Jxl => "JXL",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The user's target choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    /// Re-encode into whatever format the source already has.
    #[default]
    Original,
    Format(ImageFormat),
}

impl OutputFormat {
    pub fn id(self) -> &'static str {
        match self {
            OutputFormat::Original => "original",
            OutputFormat::Format(f) => f.extension(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            OutputFormat::Original => "Original",
            OutputFormat::Format(f) => f.display_name(),
        }
    }

    /// Extension the output file gets for `source`. `Original` keeps the
    /// source's extension exactly as written.
    pub fn target_extension(self, source: &Path) -> String {
        match self {
            OutputFormat::Original => source
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            OutputFormat::Format(f) => f.extension().to_string(),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("original") {
            return Ok(OutputFormat::Original);
        }
        ImageFormat::from_extension(s)
            .map(OutputFormat::Format)
            .ok_or_else(|| AppError::tool_missing(s, None))
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(f: OutputFormat) -> String {
        f.id().to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Canonical display order of the user-selectable formats.
pub const ALL_FORMATS: [OutputFormat; 6] = [
    OutputFormat::Original,
    OutputFormat::Format(ImageFormat::Webp),
    OutputFormat::Format(ImageFormat::Avif),
    OutputFormat::Format(ImageFormat::Jxl),
    OutputFormat::Format(ImageFormat::Png),
    OutputFormat::Format(ImageFormat::Jpeg),
];

pub const DEFAULT_ENABLED_FORMATS: &str = "original,webp,avif,jxl";

fn canonical_index(format: &OutputFormat) -> usize {
    ALL_FORMATS
        .iter()
        .position(|f| f == format)
        .unwrap_or(usize::MAX)
}

/// Sorts into canonical order. Formats outside the catalogue go last, in
/// their original relative order.
pub fn sorted_formats(formats: &[OutputFormat]) -> Vec<OutputFormat> {
    let mut sorted = formats.to_vec();
    sorted.sort_by_key(canonical_index);
    sorted
}

/// Parses a comma-separated format list such as `"original,webp,avif"`.
pub fn parse_format_list(list: &str) -> Result<Vec<OutputFormat>, AppError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
