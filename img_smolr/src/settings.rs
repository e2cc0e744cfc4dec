//! Conversion settings
//!
//! Read once per run. Every field has a default so a partial JSON file, or
//! none at all, is valid.

use crate::encoding_params::EncodingRequest;
use crate::formats::{parse_format_list, sorted_formats, ImageFormat, OutputFormat};
use crate::naming;
use crate::profile::{OptimizationProfile, Quality};
use serde::{Deserialize, Serialize};
use shared_utils::app_error::{AppError, Result};
use shared_utils::common_utils::get_extension_lowercase;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SUFFIX: &str = "_smolr";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub output_format: OutputFormat,
    pub quality: Quality,
    pub profile: OptimizationProfile,
    pub file_suffix: String,
    /// Comma-separated format ids offered to the user.
    pub enabled_formats: String,
    pub hide_warnings: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Original,
            quality: Quality::DEFAULT,
            profile: OptimizationProfile::Balanced,
            file_suffix: DEFAULT_SUFFIX.to_string(),
            enabled_formats: crate::formats::DEFAULT_ENABLED_FORMATS.to_string(),
            hide_warnings: false,
        }
    }
}

impl ConversionSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::settings(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        debug!(path = %path.display(), ?settings, "Loaded settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        Quality::new(self.quality.value())?;
        let enabled = parse_format_list(&self.enabled_formats)
            .map_err(|e| AppError::settings(format!("enabled_formats: {}", e)))?;
        if enabled.is_empty() {
            return Err(AppError::settings("enabled_formats is empty"));
        }
        Ok(())
    }

    /// Enabled formats in canonical order.
    pub fn enabled_format_list(&self) -> Vec<OutputFormat> {
        parse_format_list(&self.enabled_formats)
            .map(|list| sorted_formats(&list))
            .unwrap_or_default()
    }

    /// Encoder target for `source`. `ToolMissing` when the format has no
    /// encoder mapping.
    pub fn target_format(&self, source: &Path) -> Result<ImageFormat> {
        match self.output_format {
            OutputFormat::Format(f) => Ok(f),
            OutputFormat::Original => {
                let ext = get_extension_lowercase(source);
                ImageFormat::from_extension(&ext).ok_or_else(|| AppError::tool_missing(ext, None))
            }
        }
    }

    pub fn request_for(&self, source: &Path) -> Result<EncodingRequest> {
        Ok(EncodingRequest {
            format: self.target_format(source)?,
            quality: self.quality,
            profile: self.profile,
        })
    }

    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let ext = self.output_format.target_extension(source);
        naming::output_path(source, &self.file_suffix, &ext)
    }
}

/// Where tools and scratch files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Searched before `PATH`.
    pub tools_dir: Option<PathBuf>,
    /// Intermediate files are created here.
    pub scratch_dir: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tools_dir: None,
            scratch_dir: std::env::temp_dir(),
        }
    }
}
