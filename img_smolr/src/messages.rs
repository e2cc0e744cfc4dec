//! Run-level warning and error lists

/// Warnings are deduplicated by text; errors keep every occurrence in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBoard {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl MessageBoard {
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns false when an identical warning is already present.
    pub fn add_warning(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.warnings.contains(&message) {
            return false;
        }
        self.warnings.push(message);
        true
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Removes every warning whose text contains `needle`.
    pub fn remove_warnings_containing(&mut self, needle: &str) -> bool {
        let before = self.warnings.len();
        self.warnings.retain(|w| !w.contains(needle));
        self.warnings.len() != before
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn dismiss_warning(&mut self, index: usize) -> Option<String> {
        (index < self.warnings.len()).then(|| self.warnings.remove(index))
    }

    pub fn dismiss_error(&mut self, index: usize) -> Option<String> {
        (index < self.errors.len()).then(|| self.errors.remove(index))
    }
}
