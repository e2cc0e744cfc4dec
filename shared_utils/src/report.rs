//! Report Module
//!
//! End-of-run summary for the terminal.

use chrono::Local;
use console::style;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct SummaryReport {
    pub total: usize,
    pub converted: usize,
    pub original_bytes: u64,
    /// Negative when the outputs grew.
    pub saved_bytes: i64,
    pub duration: Duration,
    pub cancelled: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SummaryReport {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// "Saved 1.20 MB (35.0%)", or "Size increased by 3.00 KB" when negative.
///
/// Growth is reported as-is rather than clamped to zero.
pub fn format_savings(saved_bytes: i64, original_bytes: u64) -> String {
    if saved_bytes < 0 {
        return format!("Size increased by {}", format_bytes(saved_bytes.unsigned_abs()));
    }
    let pct = if original_bytes > 0 {
        saved_bytes as f64 / original_bytes as f64 * 100.0
    } else {
        0.0
    };
    format!("Saved {} ({:.1}%)", format_bytes(saved_bytes as u64), pct)
}

pub fn print_summary_report(report: &SummaryReport, operation_name: &str) {
    println!();
    println!(
        "{} {}",
        style(format!("{} summary", operation_name)).cyan().bold(),
        style(Local::now().format("%Y-%m-%d %H:%M:%S")).dim()
    );
    println!("  Files queued:   {:>8}", report.total);
    println!("  Converted:      {:>8}", style(report.converted).green());
    if report.failed() > 0 {
        println!("  Failed:         {:>8}", style(report.failed()).red());
    }
    println!("  Time:           {:>8}", format_duration(report.duration));
    if report.converted > 0 {
        let line = format_savings(report.saved_bytes, report.original_bytes);
        if report.saved_bytes < 0 {
            println!("  {}", style(line).yellow());
        } else {
            println!("  {}", style(line).green());
        }
    }
    if report.cancelled {
        println!("  {}", style("Run cancelled before all files were converted").yellow());
    }

    for warning in &report.warnings {
        println!("{} {}", style("warning:").yellow().bold(), warning);
    }
    for error in &report.errors {
        println!("{} {}", style("error:").red().bold(), error);
    }
}
