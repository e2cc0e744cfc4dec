//! Aggregate run statistics

use serde::Serialize;
use shared_utils::report::format_savings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_files_to_convert: usize,
    pub files_converted: usize,
    pub total_original_bytes: u64,
    /// Negative when outputs came out larger than their sources.
    pub total_bytes_saved: i64,
}

impl RunStats {
    pub fn for_run(total_files_to_convert: usize) -> Self {
        Self {
            total_files_to_convert,
            ..Self::default()
        }
    }

    /// Counts a successful conversion. Byte totals only move when both sizes
    /// could be read.
    pub fn record_success(&mut self, original: Option<u64>, output: Option<u64>) {
        self.files_converted += 1;
        if let (Some(original), Some(output)) = (original, output) {
            self.total_original_bytes += original;
            self.total_bytes_saved += original as i64 - output as i64;
        }
    }

    /// `None` until some bytes have been measured.
    pub fn savings_message(&self) -> Option<String> {
        (self.total_original_bytes > 0)
            .then(|| format_savings(self.total_bytes_saved, self.total_original_bytes))
    }
}
