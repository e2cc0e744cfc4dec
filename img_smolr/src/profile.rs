//! Optimization profiles and the quality level

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use shared_utils::app_error::{AppError, Result};
use std::fmt;

/// Encoder effort preset. Each format interprets it on its own; it is not a
/// numeric scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationProfile {
    Fast,
    #[default]
    Balanced,
    Quality,
    Size,
}

impl OptimizationProfile {
    pub const ALL: [OptimizationProfile; 4] = [
        OptimizationProfile::Fast,
        OptimizationProfile::Balanced,
        OptimizationProfile::Quality,
        OptimizationProfile::Size,
    ];

    pub fn id(self) -> &'static str {
        match self {
            OptimizationProfile::Fast => "fast",
            OptimizationProfile::Balanced => "balanced",
            OptimizationProfile::Quality => "quality",
            OptimizationProfile::Size => "size",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            OptimizationProfile::Fast => "Fast",
            OptimizationProfile::Balanced => "Balanced",
            OptimizationProfile::Quality => "Quality (slower)",
            OptimizationProfile::Size => "Size (smallest)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OptimizationProfile::Fast => "Quick processing with basic optimization",
            OptimizationProfile::Balanced => "Good balance between speed and quality",
            OptimizationProfile::Quality => "Maximum quality. Takes significantly more time",
            OptimizationProfile::Size => {
                "Smallest file size, more aggressive compression. Takes significantly more time"
            }
        }
    }
}

impl fmt::Display for OptimizationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Encoder quality, 50 to 100 inclusive. 100 means lossless where the format
/// has a lossless mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 50;
    pub const MAX: u8 = 100;
    pub const DEFAULT: Quality = Quality(85);

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lossless(self) -> bool {
        self.0 == Self::MAX
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Quality {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
