//! Shared Utilities for the smolr image transcoder
//!
//! Everything the conversion engine needs from the outside world, behind
//! small traits so the engine can be driven by fakes in tests:
//! - unified error type (`AppError`)
//! - logging setup and external tool records
//! - external tool lookup (`ToolLocator`)
//! - external process execution (`ProcessRunner`)
//! - filesystem capability (`FileSystem`)
//! - image recognition and directory enumeration
//! - end-of-run summary report

pub mod app_error;
pub mod batch;
pub mod common_utils;
pub mod filesystem;
pub mod logging;
pub mod path_safety;
pub mod process_runner;
pub mod report;
pub mod tools;

pub use app_error::{Access, AppError, Result};
pub use batch::{collect_files, collect_images, is_image_file, IMAGE_EXTENSIONS};
pub use common_utils::{display_name, get_extension_lowercase, has_extension};
pub use filesystem::{FileSystem, LocalFileSystem};
pub use path_safety::safe_path_arg;
pub use process_runner::{ProcessOutcome, ProcessRunner, SystemProcessRunner};
pub use report::{format_bytes, format_savings, print_summary_report, SummaryReport};
pub use tools::{missing_tools, BundledToolLocator, ToolLocator};
