//! Pre-conversion checks
//!
//! Output collisions and low disk space only ever produce warnings. Missing
//! read or write permission fails the single item it concerns.

use crate::messages::MessageBoard;
use crate::queue::FileQueue;
use crate::settings::ConversionSettings;
use crate::status::{ConversionStatus, ItemId};
use shared_utils::app_error::{AppError, Result};
use shared_utils::filesystem::FileSystem;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const OVERWRITE_ITEM_WARNING: &str = "Existing output file will be overwritten";
pub const OVERWRITE_RUN_WARNING: &str = "Some files will be overwritten";
/// Matches every overwrite-related run warning.
pub const OVERWRITE_MARKER: &str = "will be overwritten";

/// Free space below this many bytes raises a warning.
pub const LOW_DISK_THRESHOLD: u64 = 1_000_000_000;

/// Marks every pending image whose output already exists, and clears the mark
/// from items whose collision went away. Returns the items whose status
/// changed.
pub(crate) fn check_output_conflicts(
    queue: &mut FileQueue,
    board: &mut MessageBoard,
    settings: &ConversionSettings,
    fs: &dyn FileSystem,
) -> Vec<(ItemId, ConversionStatus)> {
    let mut updates = Vec::new();
    let mut conflicts = 0usize;

    for item in queue.pending_images() {
        if *item.status() == ConversionStatus::Converting {
            continue;
        }
        let output = settings.output_path_for(item.path());
        if fs.exists(&output) {
            conflicts += 1;
            let warning = ConversionStatus::Warning(OVERWRITE_ITEM_WARNING.to_string());
            if *item.status() != warning {
                updates.push((item.id(), warning));
            }
        } else if item.status().is_warning() {
            updates.push((item.id(), ConversionStatus::NotStarted));
        }
    }

    for (id, status) in &updates {
        queue.set_status(*id, status.clone());
    }

    board.remove_warnings_containing(OVERWRITE_MARKER);
    if conflicts > 0 {
        debug!(conflicts, "Existing outputs found");
        board.add_warning(OVERWRITE_RUN_WARNING);
    }
    updates
}

/// Source readable and destination directory writable.
pub fn check_permissions(fs: &dyn FileSystem, source: &Path, output: &Path) -> Result<()> {
    if !fs.is_readable(source) {
        return Err(AppError::read_denied(source));
    }
    let dir = output_dir(output);
    if !fs.is_dir_writable(&dir) {
        return Err(AppError::write_denied(dir));
    }
    Ok(())
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `Low disk space (X.XGB free)` when `free` is under the threshold.
pub fn low_disk_warning(free: u64) -> Option<String> {
    (free < LOW_DISK_THRESHOLD)
        .then(|| format!("Low disk space ({:.1}GB free)", free as f64 / 1_000_000_000.0))
}

/// Checks the scratch directory and every output directory of the pending
/// queue, reporting on the fullest volume.
pub(crate) fn check_disk_space(
    queue: &FileQueue,
    settings: &ConversionSettings,
    fs: &dyn FileSystem,
    scratch_dir: &Path,
) -> Option<String> {
    let mut dirs: BTreeSet<PathBuf> = queue
        .pending_images()
        .map(|item| output_dir(&settings.output_path_for(item.path())))
        .collect();
    dirs.insert(scratch_dir.to_path_buf());

    let min_free = dirs.iter().filter_map(|d| fs.free_space(d)).min()?;
    low_disk_warning(min_free)
}
