use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use img_smolr::encoding_params::{select, Tool, ToolArgs};
use img_smolr::formats::{ImageFormat, OutputFormat, ALL_FORMATS};
use img_smolr::{
    CancellationToken, Capabilities, ConversionSettings, ConversionStatus, OptimizationProfile,
    Orchestrator, Quality, Session, SessionEvent, StatusSink, ToolConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use shared_utils::common_utils::display_name;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::report::{print_summary_report, SummaryReport};
use shared_utils::tools::missing_tools;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "smolr")]
#[command(version, about = "Batch image transcoder - shrink images with external encoders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert files and directories
    Run {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        tools: ToolOpts,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Report output collisions, low disk space and missing tools without converting
    Check {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        tools: ToolOpts,
    },

    /// Print the encoder arguments chosen for a format, quality and profile
    Params {
        #[arg(short, long, value_parser = parse_image_format)]
        format: ImageFormat,

        #[arg(short, long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(50..=100))]
        quality: u8,

        #[arg(short, long, value_enum, default_value_t = OptimizationProfile::Balanced)]
        profile: OptimizationProfile,
    },

    /// List output formats and profiles
    Formats {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// JSON settings file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// original, webp, avif, jxl, png or jpeg (gif only re-optimizes GIF sources)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    #[arg(short, long, value_parser = clap::value_parser!(u8).range(50..=100))]
    quality: Option<u8>,

    #[arg(short, long, value_enum)]
    profile: Option<OptimizationProfile>,

    #[arg(short, long)]
    suffix: Option<String>,

    #[arg(long)]
    hide_warnings: bool,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<ConversionSettings> {
        let mut settings = match &self.config {
            Some(path) => ConversionSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => ConversionSettings::default(),
        };
        if let Some(format) = self.format {
            settings.output_format = format;
        }
        if let Some(q) = self.quality {
            settings.quality = Quality::new(q)?;
        }
        if let Some(profile) = self.profile {
            settings.profile = profile;
        }
        if let Some(suffix) = &self.suffix {
            settings.file_suffix = suffix.clone();
        }
        if self.hide_warnings {
            settings.hide_warnings = true;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Args)]
struct ToolOpts {
    /// Directory searched for encoders before PATH
    #[arg(long)]
    tools_dir: Option<PathBuf>,

    /// Where intermediate files are written
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

impl ToolOpts {
    fn resolve(&self) -> ToolConfig {
        let defaults = ToolConfig::default();
        ToolConfig {
            tools_dir: self.tools_dir.clone(),
            scratch_dir: self.scratch_dir.clone().unwrap_or(defaults.scratch_dir),
        }
    }
}

fn parse_image_format(s: &str) -> std::result::Result<ImageFormat, String> {
    ImageFormat::from_extension(s).ok_or_else(|| format!("unknown format: {}", s))
}

/// Drives the terminal progress bar from session events.
struct ProgressSink {
    bar: ProgressBar,
    verbose: bool,
}

impl StatusSink for ProgressSink {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::RunStarted { total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
            }
            SessionEvent::ItemStatus { path, status, .. } => match status {
                ConversionStatus::Converting => self.bar.set_message(display_name(path)),
                ConversionStatus::Done => {
                    self.bar.inc(1);
                    if self.verbose {
                        self.bar
                            .println(format!("  {} {}", style("✅").green(), display_name(path)));
                    }
                }
                ConversionStatus::Failed => {
                    self.bar.inc(1);
                    self.bar
                        .println(format!("  {} {}", style("❌").red(), display_name(path)));
                }
                _ => {}
            },
            SessionEvent::Stats(stats) => {
                if let Some(line) = stats.savings_message() {
                    self.bar.set_prefix(line);
                }
            }
            _ => {}
        }
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(template) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {prefix} {msg}")
    {
        bar.set_style(template.progress_chars("█▓░"));
    }
    bar
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = init_logging(
        "smolr",
        &["smolr", "img_smolr", "shared_utils"],
        LogConfig::default().with_level(level),
    );

    match cli.command {
        Commands::Run {
            inputs,
            settings,
            tools,
            verbose,
        } => run(inputs, settings.resolve()?, tools.resolve(), verbose),
        Commands::Check {
            inputs,
            settings,
            tools,
        } => check(inputs, settings.resolve()?, tools.resolve()),
        Commands::Params {
            format,
            quality,
            profile,
        } => {
            print_params(format, Quality::new(quality)?, profile);
            Ok(())
        }
        Commands::Formats { config } => {
            let settings = match config {
                Some(path) => ConversionSettings::load(&path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?,
                None => ConversionSettings::default(),
            };
            print_formats(&settings);
            Ok(())
        }
    }
}

fn run(
    inputs: Vec<PathBuf>,
    settings: ConversionSettings,
    tools: ToolConfig,
    verbose: bool,
) -> Result<()> {
    let session = Session::new(settings, Capabilities::system(&tools));
    let bar = progress_bar();
    session.add_sink(Arc::new(ProgressSink {
        bar: bar.clone(),
        verbose,
    }));

    let ids = session.add_paths(&inputs);
    if ids.is_empty() {
        println!("{}", style("No files found.").yellow());
        return Ok(());
    }
    println!("📁 Queued: {} files", style(ids.len()).green());

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to install Ctrl-C handler")?;

    let summary = Orchestrator::new(session.clone()).run(&token);
    bar.finish_and_clear();

    let snapshot = session.snapshot();
    let report = SummaryReport {
        total: summary.stats.total_files_to_convert,
        converted: summary.stats.files_converted,
        original_bytes: summary.stats.total_original_bytes,
        saved_bytes: summary.stats.total_bytes_saved,
        duration: summary.duration,
        cancelled: summary.cancelled,
        errors: snapshot.errors,
        warnings: session.visible_warnings(),
    };
    print_summary_report(&report, "smolr");
    Ok(())
}

fn check(inputs: Vec<PathBuf>, settings: ConversionSettings, tools: ToolConfig) -> Result<()> {
    let caps = Capabilities::system(&tools);
    let names: Vec<&str> = Tool::ALL.iter().map(|t| t.name()).collect();
    let missing = missing_tools(caps.locator.as_ref(), &names);

    let session = Session::new(settings, caps);
    session.add_paths(&inputs);
    let snapshot = session.snapshot();

    println!("📁 Queued: {} files", style(snapshot.items.len()).green());
    for item in &snapshot.items {
        if let ConversionStatus::Warning(reason) = item.status() {
            println!(
                "  {} {} ({})",
                style("⚠️").yellow(),
                item.path().display(),
                style(reason).dim()
            );
        }
    }
    for warning in session.visible_warnings() {
        println!("{} {}", style("warning:").yellow().bold(), warning);
    }
    if missing.is_empty() {
        println!("{}", style("All encoders and decoders found.").green());
    } else {
        println!(
            "{} {}",
            style("missing tools:").red().bold(),
            missing.join(", ")
        );
    }
    Ok(())
}

fn print_step(label: &str, step: &ToolArgs) {
    println!(
        "{:>9} {} {}",
        style(label).cyan(),
        style(step.tool).bold(),
        step.knobs.join(" ")
    );
}

fn print_params(format: ImageFormat, quality: Quality, profile: OptimizationProfile) {
    let plan = select(format, quality, profile);
    println!(
        "{} q{} {}",
        style(format.display_name()).bold(),
        quality,
        profile.display_name()
    );
    print_step("primary", &plan.primary);
    if let Some(fallback) = &plan.fallback {
        print_step("fallback", fallback);
    }
}

fn print_formats(settings: &ConversionSettings) {
    let enabled = settings.enabled_format_list();
    println!("{}", style("Formats").cyan().bold());
    for format in ALL_FORMATS {
        let mark = if enabled.contains(&format) { "*" } else { " " };
        println!("  {} {:<9} {}", mark, format.id(), format.display_name());
    }
    println!("{}", style("Profiles").cyan().bold());
    for profile in OptimizationProfile::ALL {
        println!(
            "    {:<9} {:<17} {}",
            profile.id(),
            profile.display_name(),
            style(profile.description()).dim()
        );
    }
}
