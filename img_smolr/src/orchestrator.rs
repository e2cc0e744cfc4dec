//! Conversion run loop
//!
//! Visits the queue once, in order, one item at a time. Cancellation is
//! checked before each item and never interrupts a tool that is already
//! running. The session lock is never held while a tool runs, so the caller
//! can remove items mid-run; results for removed items are dropped.

use crate::pipeline::ConversionPipeline;
use crate::session::Session;
use crate::settings::ConversionSettings;
use crate::stats::RunStats;
use crate::validation::check_permissions;
use shared_utils::app_error::{AppError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Cooperative stop flag shared between the caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: RunStats,
    pub cancelled: bool,
    pub duration: Duration,
}

pub struct Orchestrator {
    session: Session,
}

impl Orchestrator {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Runs on a dedicated thread.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<RunSummary> {
        thread::spawn(move || self.run(&token))
    }

    pub fn run(&self, token: &CancellationToken) -> RunSummary {
        let start = Instant::now();
        let settings = self.session.settings();
        let ids = self.session.begin_run();
        let pipeline = ConversionPipeline::new(self.session.capabilities());
        info!(
            queued = ids.len(),
            format = %settings.output_format,
            quality = %settings.quality,
            profile = %settings.profile,
            "Conversion run started"
        );

        let mut cancelled = false;
        for id in ids {
            if token.is_cancelled() {
                info!("Conversion run cancelled");
                cancelled = true;
                break;
            }
            let source = match self.session.claim(id) {
                Some(source) => source,
                None => continue,
            };

            match self.convert_one(&pipeline, &settings, &source) {
                Ok((original, output)) => {
                    if self.session.commit_success(id, original, output) {
                        info!(source = %source.display(), "Converted");
                    }
                }
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "Conversion failed");
                    self.session.commit_failure(id, e.user_message(&source));
                }
            }
        }

        self.session.finish_run(cancelled);
        let summary = RunSummary {
            stats: self.session.stats(),
            cancelled,
            duration: start.elapsed(),
        };
        info!(
            converted = summary.stats.files_converted,
            total = summary.stats.total_files_to_convert,
            saved = summary.stats.total_bytes_saved,
            "Conversion run finished"
        );
        summary
    }

    /// Validates and converts one source. Returns the original and output
    /// sizes, either of which may be unreadable.
    fn convert_one(
        &self,
        pipeline: &ConversionPipeline<'_>,
        settings: &ConversionSettings,
        source: &Path,
    ) -> Result<(Option<u64>, Option<u64>)> {
        let fs = self.session.capabilities().fs.as_ref();
        let output = settings.output_path_for(source);
        if output == source {
            return Err(AppError::SameFile { path: output });
        }
        check_permissions(fs, source, &output)?;

        let request = settings.request_for(source)?;
        let original = fs.file_size(source);
        pipeline.convert(source, &output, &request)?;
        Ok((original, fs.file_size(&output)))
    }
}
