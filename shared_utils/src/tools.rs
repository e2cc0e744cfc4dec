//! External tool lookup
//!
//! Encoders and decoders are resolved by logical name ("cwebp", "oxipng", ...).
//! A bundled tools directory, when configured, wins over `PATH`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub trait ToolLocator: Send + Sync {
    /// Absolute path of `tool`, or `None` when it cannot be run.
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Looks in `tools_dir` first, then on `PATH`. Results are cached per name.
pub struct BundledToolLocator {
    tools_dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl BundledToolLocator {
    pub fn new(tools_dir: Option<PathBuf>) -> Self {
        Self {
            tools_dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn tools_dir(&self) -> Option<&Path> {
        self.tools_dir.as_deref()
    }

    fn resolve(&self, tool: &str) -> Option<PathBuf> {
        if let Some(dir) = &self.tools_dir {
            let candidate = dir.join(tool);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        which::which(tool).ok()
    }
}

impl Default for BundledToolLocator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ToolLocator for BundledToolLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(tool) {
            return hit.clone();
        }
        let found = self.resolve(tool);
        debug!(tool, path = ?found, "Resolved external tool");
        cache.insert(tool.to_string(), found.clone());
        found
    }
}

/// Reports which of `tools` cannot be found, in input order.
pub fn missing_tools<'a>(locator: &dyn ToolLocator, tools: &[&'a str]) -> Vec<&'a str> {
    tools
        .iter()
        .copied()
        .filter(|t| locator.locate(t).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_dir_wins() {
        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("smolr-test-encoder");
        fs::write(&fake, b"#!/bin/sh\n").unwrap();

        let locator = BundledToolLocator::new(Some(dir.path().to_path_buf()));
        assert_eq!(locator.locate("smolr-test-encoder"), Some(fake));
    }

    #[test]
    fn test_unknown_tool_is_none_and_cached() {
        let locator = BundledToolLocator::default();
        assert!(locator.locate("definitely-not-a-real-tool-xyz").is_none());
        assert!(locator
            .cache
            .lock()
            .unwrap()
            .contains_key("definitely-not-a-real-tool-xyz"));
    }

    #[test]
    fn test_missing_tools_preserves_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cwebp"), b"").unwrap();
        let locator = BundledToolLocator::new(Some(dir.path().to_path_buf()));
        let missing = missing_tools(&locator, &["no-such-a", "cwebp", "no-such-b"]);
        assert_eq!(missing, vec!["no-such-a", "no-such-b"]);
    }
}
