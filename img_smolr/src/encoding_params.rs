//! Encoder parameter selection
//!
//! Maps (target format, quality, profile) to the argument lists of the
//! external encoders. Pure: nothing here touches the disk or spawns anything.

use crate::formats::ImageFormat;
use crate::profile::{OptimizationProfile, Quality};
use shared_utils::common_utils::get_extension_lowercase;
use shared_utils::path_safety::safe_path_arg;
use std::fmt;
use std::path::Path;

use crate::profile::OptimizationProfile::{Balanced, Fast, Size};

/// Every external executable the engine may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Oxipng,
    Pngquant,
    Cjpeg,
    Gifsicle,
    Cwebp,
    Avifenc,
    Cjxl,
    Djxl,
    Avifdec,
    Dwebp,
    Magick,
}

impl Tool {
    pub const ALL: [Tool; 11] = [
        Tool::Oxipng,
        Tool::Pngquant,
        Tool::Cjpeg,
        Tool::Gifsicle,
        Tool::Cwebp,
        Tool::Avifenc,
        Tool::Cjxl,
        Tool::Djxl,
        Tool::Avifdec,
        Tool::Dwebp,
        Tool::Magick,
    ];

    /// Logical name handed to the tool locator.
    pub fn name(self) -> &'static str {
        match self {
            Tool::Oxipng => "oxipng",
            Tool::Pngquant => "pngquant",
            Tool::Cjpeg => "cjpeg",
            Tool::Gifsicle => "gifsicle",
            Tool::Cwebp => "cwebp",
            Tool::Avifenc => "avifenc",
            Tool::Cjxl => "cjxl",
            Tool::Djxl => "djxl",
            Tool::Avifdec => "avifdec",
            Tool::Dwebp => "dwebp",
            Tool::Magick => "magick",
        }
    }

    /// Full argument vector: `knobs` plus input and output placed where this
    /// tool expects them.
    pub fn command_line(self, knobs: &[String], input: &Path, output: &Path) -> Vec<String> {
        let input = safe_path_arg(input).into_owned();
        let output = safe_path_arg(output).into_owned();
        let mut args = Vec::with_capacity(knobs.len() + 4);

        match self {
            Tool::Oxipng => {
                args.extend_from_slice(knobs);
                args.extend([input, "--out".into(), output]);
            }
            Tool::Pngquant => {
                args.extend_from_slice(knobs);
                args.extend(["--output".into(), output, input]);
            }
            Tool::Cjpeg => {
                args.extend_from_slice(knobs);
                args.extend(["-outfile".into(), output, input]);
            }
            Tool::Gifsicle => {
                args.extend_from_slice(knobs);
                args.extend(["-o".into(), output, input]);
            }
            Tool::Cwebp => {
                args.extend_from_slice(knobs);
                args.extend([input, "-o".into(), output]);
            }
            Tool::Avifenc => {
                args.extend_from_slice(knobs);
                args.extend([input, output]);
            }
            Tool::Cjxl => {
                args.extend([input, output]);
                args.extend_from_slice(knobs);
            }
            Tool::Dwebp => {
                args.extend([input, "-o".into(), output]);
                args.extend_from_slice(knobs);
            }
            Tool::Djxl | Tool::Avifdec | Tool::Magick => {
                args.extend([input, output]);
                args.extend_from_slice(knobs);
            }
        }
        args
    }
}

impl Tool {
    /// gifsicle only reads GIF, so it cannot take the PNG intermediate.
    pub fn reads_png(self) -> bool {
        self != Tool::Gifsicle
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tool invocation minus the file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolArgs {
    pub tool: Tool,
    pub knobs: Vec<String>,
}

impl ToolArgs {
    fn new<I, S>(tool: Tool, knobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool,
            knobs: knobs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn command_line(&self, input: &Path, output: &Path) -> Vec<String> {
        self.tool.command_line(&self.knobs, input, output)
    }

    pub fn has_knob(&self, knob: &str) -> bool {
        self.knobs.iter().any(|k| k == knob)
    }
}

/// What to run for one encode. `fallback` is tried on the same input when the
/// primary tool exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingPlan {
    pub primary: ToolArgs,
    pub fallback: Option<ToolArgs>,
}

impl EncodingPlan {
    fn single(primary: ToolArgs) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Primary first, then the fallback.
    pub fn steps(&self) -> impl Iterator<Item = &ToolArgs> {
        std::iter::once(&self.primary).chain(self.fallback.as_ref())
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.steps().map(|s| s.tool).collect()
    }

    /// Whether every step can encode from a PNG intermediate.
    pub fn accepts_intermediate(&self) -> bool {
        self.steps().all(|s| s.tool.reads_png())
    }
}

/// Target format, quality and profile for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingRequest {
    pub format: ImageFormat,
    pub quality: Quality,
    pub profile: OptimizationProfile,
}

impl EncodingRequest {
    pub fn plan(&self) -> EncodingPlan {
        select(self.format, self.quality, self.profile)
    }
}

pub fn select(format: ImageFormat, quality: Quality, profile: OptimizationProfile) -> EncodingPlan {
    match format {
        ImageFormat::Png => png_plan(quality, profile),
        ImageFormat::Jpeg => EncodingPlan::single(jpeg_args(quality, profile)),
        ImageFormat::Gif => EncodingPlan::single(gif_args(quality, profile)),
        ImageFormat::Webp => EncodingPlan::single(webp_args(quality, profile)),
        ImageFormat::Avif => EncodingPlan::single(avif_args(quality, profile)),
        ImageFormat::Jxl => EncodingPlan::single(jxl_args(quality, profile)),
    }
}

/// `None` when the extension has no encoder mapping ("no mapping").
pub fn select_for_extension(
    ext: &str,
    quality: Quality,
    profile: OptimizationProfile,
) -> Option<EncodingPlan> {
    ImageFormat::from_extension(ext).map(|f| select(f, quality, profile))
}

fn png_plan(quality: Quality, profile: OptimizationProfile) -> EncodingPlan {
    if quality.is_lossless() {
        let (level, strip) = match profile {
            Fast => ("2", "safe"),
            Balanced => ("3", "safe"),
            OptimizationProfile::Quality => ("4", "safe"),
            Size => ("6", "all"),
        };
        return EncodingPlan::single(ToolArgs::new(
            Tool::Oxipng,
            ["-o", level, "--strip", strip],
        ));
    }

    let q = quality.value();
    let speed = match profile {
        Fast => "10",
        Balanced => "4",
        OptimizationProfile::Quality | Size => "1",
    };
    let fallback_level = match profile {
        Fast => "2",
        Balanced => "3",
        OptimizationProfile::Quality => "4",
        Size => "max",
    };
    EncodingPlan {
        primary: ToolArgs::new(
            Tool::Pngquant,
            [
                "--quality".to_string(),
                format!("{}-{}", q, q),
                "--speed".to_string(),
                speed.to_string(),
                "--force".to_string(),
                "--strip".to_string(),
            ],
        ),
        fallback: Some(ToolArgs::new(
            Tool::Oxipng,
            ["-o", fallback_level, "--strip", "all"],
        )),
    }
}

fn jpeg_args(quality: Quality, profile: OptimizationProfile) -> ToolArgs {
    let mut knobs = vec!["-quality".to_string(), quality.to_string()];
    let extra: &[&str] = match profile {
        Fast => &["-optimize"],
        Balanced | OptimizationProfile::Quality => &["-optimize", "-progressive"],
        Size => &["-optimize", "-progressive", "-smooth", "10"],
    };
    knobs.extend(extra.iter().map(|s| s.to_string()));
    ToolArgs::new(Tool::Cjpeg, knobs)
}

/// gifsicle `--lossy` value: `100 - quality`, shifted by profile, within 0..=200.
pub fn gif_lossiness(quality: Quality, profile: OptimizationProfile) -> u32 {
    let base = u32::from(Quality::MAX - quality.value());
    match profile {
        Fast | Balanced => base,
        OptimizationProfile::Quality => base.saturating_sub(10),
        Size => (base + 20).min(200),
    }
}

fn gif_args(quality: Quality, profile: OptimizationProfile) -> ToolArgs {
    let opt = if profile == Fast { "-O2" } else { "-O3" };
    ToolArgs::new(
        Tool::Gifsicle,
        [
            opt.to_string(),
            format!("--lossy={}", gif_lossiness(quality, profile)),
            "--no-comments".to_string(),
            "--no-extensions".to_string(),
            "--no-names".to_string(),
        ],
    )
}

fn webp_args(quality: Quality, profile: OptimizationProfile) -> ToolArgs {
    let mut knobs = vec![
        "-q".to_string(),
        quality.to_string(),
        "-metadata".to_string(),
        "none".to_string(),
    ];
    let extra: &[&str] = match profile {
        Fast => &["-m", "0"],
        Balanced => &["-m", "4"],
        OptimizationProfile::Quality => &["-m", "6", "-pass", "10", "-af"],
        Size => &["-m", "6", "-pass", "10"],
    };
    knobs.extend(extra.iter().map(|s| s.to_string()));
    ToolArgs::new(Tool::Cwebp, knobs)
}

fn avif_args(quality: Quality, profile: OptimizationProfile) -> ToolArgs {
    let mut knobs = vec![
        "-q".to_string(),
        quality.to_string(),
        "--ignore-exif".to_string(),
        "--ignore-xmp".to_string(),
    ];
    let extra: &[&str] = match profile {
        Fast => &["-s", "10"],
        Balanced => &["-s", "4"],
        OptimizationProfile::Quality => &["-s", "0", "--min", "0", "--max", "56"],
        Size => &["-s", "0"],
    };
    knobs.extend(extra.iter().map(|s| s.to_string()));
    ToolArgs::new(Tool::Avifenc, knobs)
}

fn jxl_args(quality: Quality, profile: OptimizationProfile) -> ToolArgs {
    let effort = match profile {
        Fast => "3",
        Balanced => "5",
        OptimizationProfile::Quality | Size => "9",
    };
    let knobs = if quality.is_lossless() {
        vec!["--lossless_jpeg=1".to_string(), "-e".into(), effort.into()]
    } else {
        vec![
            "--lossless_jpeg=0".to_string(),
            "-q".into(),
            quality.to_string(),
            "-e".into(),
            effort.into(),
        ]
    };
    ToolArgs::new(Tool::Cjxl, knobs)
}

/// Decoder that turns `source` into the PNG intermediate.
pub fn decoder_for(source: &Path) -> Tool {
    match get_extension_lowercase(source).as_str() {
        "jxl" => Tool::Djxl,
        "avif" => Tool::Avifdec,
        "webp" => Tool::Dwebp,
        _ => Tool::Magick,
    }
}
