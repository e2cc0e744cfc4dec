//! Queue items and their conversion state

use serde::Serialize;
use shared_utils::batch::is_image_file;
use std::fmt;
use std::path::{Path, PathBuf};

/// Per-item state. `Warning` carries the reason shown next to the item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ConversionStatus {
    #[default]
    NotStarted,
    Waiting,
    Converting,
    Done,
    Failed,
    Warning(String),
}

impl ConversionStatus {
    pub fn label(&self) -> &str {
        match self {
            ConversionStatus::NotStarted => "",
            ConversionStatus::Waiting => "Waiting",
            ConversionStatus::Converting => "Converting...",
            ConversionStatus::Done => "Done",
            ConversionStatus::Failed => "Failed",
            ConversionStatus::Warning(message) => message,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ConversionStatus::Warning(_))
    }
}

/// Stable identity of a queued file. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub(crate) u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileItem {
    id: ItemId,
    path: PathBuf,
    status: ConversionStatus,
}

impl FileItem {
    pub(crate) fn new(id: ItemId, path: PathBuf) -> Self {
        Self {
            id,
            path,
            status: ConversionStatus::NotStarted,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> &ConversionStatus {
        &self.status
    }

    pub fn is_image(&self) -> bool {
        is_image_file(&self.path)
    }

    pub(crate) fn set_status(&mut self, status: ConversionStatus) {
        self.status = status;
    }
}
