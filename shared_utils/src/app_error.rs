//! AppError - unified error type for the conversion engine
//!
//! Every variant except `Settings` is item-local: the orchestrator catches it,
//! marks the item failed, appends `user_message()` to the run error list and
//! moves on to the next item.

use crate::common_utils::display_name;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which side of a conversion a permission check refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// No argument mapping for the format, or no resolvable executable.
    #[error("Unsupported format: {format}")]
    ToolMissing {
        format: String,
        tool: Option<String>,
    },

    #[error("Permission denied ({access:?}): {}", path.display())]
    PermissionDenied { access: Access, path: PathBuf },

    #[error("{tool} exited with status {exit_code:?}")]
    CommandFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Decoding {} with {tool} failed", input.display())]
    DecodeFailure {
        tool: String,
        input: PathBuf,
        stderr: String,
    },

    #[error("Output would overwrite its own source: {}", path.display())]
    SameFile { path: PathBuf },

    #[error("Quality must be between 50 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn tool_missing(format: impl Into<String>, tool: Option<&str>) -> Self {
        Self::ToolMissing {
            format: format.into(),
            tool: tool.map(String::from),
        }
    }

    pub fn read_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied {
            access: Access::Read,
            path: path.into(),
        }
    }

    pub fn write_denied(dir: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied {
            access: Access::Write,
            path: dir.into(),
        }
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Whether the fallback pipeline may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::CommandFailure { .. })
    }

    /// The line shown in the run error list for a failed `source`.
    ///
    /// Tool stderr is deliberately absent; it only goes to the log.
    pub fn user_message(&self, source: &Path) -> String {
        let name = display_name(source);

        match self {
            AppError::ToolMissing { format, .. } => format!("Unsupported format: {}", format),
            AppError::PermissionDenied {
                access: Access::Read,
                ..
            } => format!("Cannot read {} - permission denied", name),
            AppError::PermissionDenied {
                access: Access::Write,
                ..
            } => "Cannot write to output directory - permission denied".to_string(),
            AppError::SameFile { .. } => {
                format!("Cannot convert {} - output would replace the source", name)
            }
            AppError::InvalidQuality(_) | AppError::Settings(_) => self.to_string(),
            AppError::CommandFailure { .. } | AppError::DecodeFailure { .. } | AppError::Io(_) => {
                format!("Failed to convert {}", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tool_missing_message_names_format() {
        let err = AppError::tool_missing("tiff", None);
        assert_eq!(
            err.user_message(Path::new("/a/scan.tiff")),
            "Unsupported format: tiff"
        );
    }

    #[test]
    fn test_permission_messages() {
        let src = Path::new("/photos/cat.png");
        assert_eq!(
            AppError::read_denied(src).user_message(src),
            "Cannot read cat.png - permission denied"
        );
        assert_eq!(
            AppError::write_denied("/photos").user_message(src),
            "Cannot write to output directory - permission denied"
        );
    }

    #[test]
    fn test_stderr_not_in_user_message() {
        let err = AppError::CommandFailure {
            tool: "cwebp".into(),
            exit_code: Some(255),
            stderr: "Unsupported color conversion request".into(),
        };
        let msg = err.user_message(Path::new("x.jpg"));
        assert_eq!(msg, "Failed to convert x.jpg");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_failure_not_retryable() {
        let err = AppError::DecodeFailure {
            tool: "djxl".into(),
            input: PathBuf::from("a.jxl"),
            stderr: String::new(),
        };
        assert!(!err.is_retryable());
    }

    fn arb_app_error() -> impl Strategy<Value = AppError> {
        prop_oneof![
            any::<String>().prop_map(|s| AppError::tool_missing(s, None)),
            any::<String>().prop_map(AppError::read_denied),
            any::<String>().prop_map(AppError::write_denied),
            (any::<String>(), any::<Option<i32>>()).prop_map(|(t, c)| {
                AppError::CommandFailure {
                    tool: t,
                    exit_code: c,
                    stderr: String::new(),
                }
            }),
            any::<String>().prop_map(|s| AppError::SameFile { path: PathBuf::from(s) }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn app_error_has_user_message(error in arb_app_error()) {
            let msg = error.user_message(Path::new("/tmp/in.png"));
            prop_assert!(!msg.is_empty(),
                "AppError {:?} should have non-empty user message", error
            );
        }
    }
}
