//! smolr conversion engine
//!
//! Batch transcoding of image files through external encoders and decoders:
//! parameter selection per format and profile, direct or intermediate
//! encoding, per-item state, pre-conversion checks and run statistics.

pub mod encoding_params;
pub mod formats;
pub mod messages;
pub mod naming;
pub mod orchestrator;
pub mod pipeline;
pub mod profile;
pub mod queue;
pub mod session;
pub mod settings;
pub mod stats;
pub mod status;
pub mod validation;

#[cfg(test)]
mod testing;

pub use shared_utils::app_error::{AppError, Result};

pub use encoding_params::{select, EncodingPlan, EncodingRequest, Tool, ToolArgs};
pub use formats::{ImageFormat, OutputFormat, ALL_FORMATS};
pub use orchestrator::{CancellationToken, Orchestrator, RunSummary};
pub use pipeline::{Capabilities, ConversionPipeline};
pub use profile::{OptimizationProfile, Quality};
pub use session::{Session, SessionEvent, SessionSnapshot, StatusSink};
pub use settings::{ConversionSettings, ToolConfig};
pub use stats::RunStats;
pub use status::{ConversionStatus, FileItem, ItemId};
