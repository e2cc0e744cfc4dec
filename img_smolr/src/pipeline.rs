//! Direct and intermediate encoding
//!
//! When the target format matches the source, the encoder is run on the source
//! directly. Otherwise, or when that direct attempt fails, the source is
//! decoded to a PNG intermediate in the scratch directory and the intermediate
//! is encoded. The intermediate is removed on every exit path. Encoders that
//! cannot read PNG (gifsicle) only ever see their own format.

use crate::encoding_params::{decoder_for, EncodingPlan, EncodingRequest, Tool, ToolArgs};
use crate::formats::ImageFormat;
use crate::settings::ToolConfig;
use shared_utils::app_error::{AppError, Result};
use shared_utils::common_utils::get_extension_lowercase;
use shared_utils::filesystem::{FileSystem, LocalFileSystem};
use shared_utils::process_runner::{ProcessOutcome, ProcessRunner, SystemProcessRunner};
use shared_utils::tools::{BundledToolLocator, ToolLocator};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The outside world as the engine sees it.
#[derive(Clone)]
pub struct Capabilities {
    pub runner: Arc<dyn ProcessRunner>,
    pub locator: Arc<dyn ToolLocator>,
    pub fs: Arc<dyn FileSystem>,
    pub scratch_dir: PathBuf,
}

impl Capabilities {
    /// Real processes, real disk, tools from `config.tools_dir` or `PATH`.
    pub fn system(config: &ToolConfig) -> Self {
        Self {
            runner: Arc::new(SystemProcessRunner),
            locator: Arc::new(BundledToolLocator::new(config.tools_dir.clone())),
            fs: Arc::new(LocalFileSystem),
            scratch_dir: config.scratch_dir.clone(),
        }
    }
}

/// Removes the intermediate through the filesystem capability when dropped.
struct IntermediateFile {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl IntermediateFile {
    /// Reserves a unique `.png` name in `dir`.
    fn create(dir: &Path, fs: Arc<dyn FileSystem>) -> io::Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("smolr-")
            .suffix(".png")
            .tempfile_in(dir)?
            .into_temp_path()
            .keep()
            .map_err(|e| e.error)?;
        Ok(Self { path, fs })
    }
}

impl Drop for IntermediateFile {
    fn drop(&mut self) {
        match self.fs.remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed intermediate"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not remove intermediate"),
        }
    }
}

pub struct ConversionPipeline<'a> {
    caps: &'a Capabilities,
}

impl<'a> ConversionPipeline<'a> {
    pub fn new(caps: &'a Capabilities) -> Self {
        Self { caps }
    }

    pub fn convert(&self, source: &Path, output: &Path, request: &EncodingRequest) -> Result<()> {
        let plan = request.plan();
        let resolved = self.resolve(&plan, request.format)?;
        let direct = ImageFormat::from_path(source) == Some(request.format);

        if direct {
            match self.encode(&plan, &resolved, source, output) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && plan.accepts_intermediate() => {
                    info!(
                        source = %source.display(),
                        error = %e,
                        "Direct encode failed, retrying through intermediate"
                    );
                }
                Err(e) => return Err(e),
            }
        } else if !plan.accepts_intermediate() {
            return Err(AppError::tool_missing(
                request.format.extension(),
                Some(plan.primary.tool.name()),
            ));
        }

        self.convert_via_intermediate(source, output, &plan, &resolved)
    }

    /// Locates every tool of the plan. Nothing runs unless all are present.
    fn resolve(&self, plan: &EncodingPlan, format: ImageFormat) -> Result<HashMap<Tool, PathBuf>> {
        let mut resolved = HashMap::new();
        for tool in plan.tools() {
            let path = self
                .caps
                .locator
                .locate(tool.name())
                .ok_or_else(|| AppError::tool_missing(format.extension(), Some(tool.name())))?;
            resolved.insert(tool, path);
        }
        Ok(resolved)
    }

    fn convert_via_intermediate(
        &self,
        source: &Path,
        output: &Path,
        plan: &EncodingPlan,
        resolved: &HashMap<Tool, PathBuf>,
    ) -> Result<()> {
        let decoder = decoder_for(source);
        let decoder_path = self.caps.locator.locate(decoder.name()).ok_or_else(|| {
            AppError::tool_missing(get_extension_lowercase(source), Some(decoder.name()))
        })?;

        let intermediate = IntermediateFile::create(&self.caps.scratch_dir, self.caps.fs.clone())?;
        debug!(
            source = %source.display(),
            intermediate = %intermediate.path.display(),
            tool = decoder.name(),
            "Decoding to intermediate"
        );

        let args = decoder.command_line(&[], source, &intermediate.path);
        let outcome = self.caps.runner.run(&decoder_path, &args);
        if let Err(stderr) = check_outcome(outcome) {
            return Err(AppError::DecodeFailure {
                tool: decoder.name().to_string(),
                input: source.to_path_buf(),
                stderr,
            });
        }

        self.encode(plan, resolved, &intermediate.path, output)
    }

    /// Runs the plan's primary step, then its fallback if the primary exits
    /// non-zero.
    fn encode(
        &self,
        plan: &EncodingPlan,
        resolved: &HashMap<Tool, PathBuf>,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut last_err = None;
        for step in plan.steps() {
            match self.run_step(step, resolved, input, output) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(tool = step.tool.name(), error = %e, "Encoder step failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| AppError::tool_missing(plan.primary.tool.name(), None)))
    }

    fn run_step(
        &self,
        step: &ToolArgs,
        resolved: &HashMap<Tool, PathBuf>,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let program = resolved
            .get(&step.tool)
            .ok_or_else(|| AppError::tool_missing(step.tool.name(), Some(step.tool.name())))?;
        let args = step.command_line(input, output);
        let outcome = self.caps.runner.run(program, &args);
        let exit_code = outcome.as_ref().ok().and_then(|o| o.exit_code);
        check_outcome(outcome).map_err(|stderr| AppError::CommandFailure {
            tool: step.tool.name().to_string(),
            exit_code,
            stderr,
        })
    }
}

/// `Err(stderr)` unless the process started and exited 0.
fn check_outcome(outcome: io::Result<ProcessOutcome>) -> std::result::Result<(), String> {
    match outcome {
        Ok(o) if o.success() => Ok(()),
        Ok(o) => Err(o.stderr),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{OptimizationProfile, Quality};
    use crate::testing::{FakeLocator, ScriptedRunner};
    use std::fs;
    use tempfile::TempDir;

    fn caps(runner: Arc<ScriptedRunner>, locator: FakeLocator, scratch: &Path) -> Capabilities {
        Capabilities {
            runner,
            locator: Arc::new(locator),
            fs: Arc::new(LocalFileSystem),
            scratch_dir: scratch.to_path_buf(),
        }
    }

    fn request(format: ImageFormat, q: u8, profile: OptimizationProfile) -> EncodingRequest {
        EncodingRequest {
            format,
            quality: Quality::new(q).unwrap(),
            profile,
        }
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_same_format_direct_encode() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("a.webp");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("a_smolr.webp");

        let runner = Arc::new(ScriptedRunner::new());
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Webp, 80, OptimizationProfile::Fast))
            .unwrap();

        assert_eq!(runner.tools_called(), ["cwebp"]);
        assert!(out.exists());
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn test_direct_failure_retries_via_intermediate() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("odd.jpg");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("odd_smolr.jpg");

        let runner = Arc::new(ScriptedRunner::new().fail_times("cjpeg", 1));
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Jpeg, 85, OptimizationProfile::Balanced))
            .unwrap();

        assert_eq!(runner.tools_called(), ["cjpeg", "magick", "cjpeg"]);
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn test_decode_failure_skips_encode() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("broken.jxl");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("broken_smolr.avif");

        let runner = Arc::new(ScriptedRunner::new().fail_times("djxl", 1));
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Avif, 70, OptimizationProfile::Size))
            .unwrap_err();

        assert!(matches!(err, AppError::DecodeFailure { .. }));
        assert_eq!(runner.tools_called(), ["djxl"]);
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn test_pngquant_failure_uses_oxipng() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("flat.png");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("flat_smolr.png");

        let runner = Arc::new(ScriptedRunner::new().fail_times("pngquant", 1));
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Png, 60, OptimizationProfile::Size))
            .unwrap();

        assert_eq!(runner.tools_called(), ["pngquant", "oxipng"]);
        let calls = runner.calls();
        assert!(calls[1].args.contains(&"max".to_string()));
    }

    #[test]
    fn test_missing_encoder_is_tool_missing() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("a.gif");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("a_smolr.gif");

        let runner = Arc::new(ScriptedRunner::new());
        let caps = caps(runner.clone(), FakeLocator::without(&["gifsicle"]), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Gif, 80, OptimizationProfile::Fast))
            .unwrap_err();

        assert_eq!(err.user_message(&src), "Unsupported format: gif");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_missing_decoder_reports_source_extension() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("a.avif");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("a_smolr.webp");

        let runner = Arc::new(ScriptedRunner::new());
        let caps = caps(runner.clone(), FakeLocator::without(&["avifdec"]), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Webp, 80, OptimizationProfile::Balanced))
            .unwrap_err();

        assert!(matches!(err, AppError::ToolMissing { .. }));
        assert_eq!(err.user_message(&src), "Unsupported format: avif");
        assert!(runner.calls().is_empty());
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn test_missing_encoder_checked_before_decoding() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("photo.heic");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("photo_smolr.webp");

        let runner = Arc::new(ScriptedRunner::new());
        let caps = caps(runner.clone(), FakeLocator::without(&["cwebp"]), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Webp, 80, OptimizationProfile::Balanced))
            .unwrap_err();

        assert_eq!(err.user_message(&src), "Unsupported format: webp");
        assert!(runner.calls().is_empty());
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn test_gif_target_never_decodes_other_sources() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("still.png");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("still_smolr.gif");

        let runner = Arc::new(ScriptedRunner::new());
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Gif, 80, OptimizationProfile::Balanced))
            .unwrap_err();

        assert_eq!(err.user_message(&src), "Unsupported format: gif");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_gif_direct_failure_has_no_fallback() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("anim.gif");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("anim_smolr.gif");

        let runner = Arc::new(ScriptedRunner::new().fail_times("gifsicle", 1));
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Gif, 80, OptimizationProfile::Fast))
            .unwrap_err();

        assert!(matches!(err, AppError::CommandFailure { .. }));
        assert_eq!(runner.tools_called(), ["gifsicle"]);
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn test_encode_failure_after_decode_cleans_intermediate() {
        let work = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let src = work.path().join("photo.heic");
        fs::write(&src, b"src").unwrap();
        let out = work.path().join("photo_smolr.avif");

        let runner = Arc::new(ScriptedRunner::new().fail_times("avifenc", 1));
        let caps = caps(runner.clone(), FakeLocator::all(), scratch.path());
        let err = ConversionPipeline::new(&caps)
            .convert(&src, &out, &request(ImageFormat::Avif, 80, OptimizationProfile::Fast))
            .unwrap_err();

        assert!(matches!(err, AppError::CommandFailure { exit_code: Some(1), .. }));
        assert!(scratch_is_empty(scratch.path()));
    }
}
