//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Status
//!
//! ```text
//! Printer Canon_G3070_series
//!     State: idle (ready)
//!     Description: Canon G3070 series
//!     Location: Studio
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 dragon.jpg → print_dragon.jpg
//! 002 broken.png
//!     Error: Unreadable image broken.png: ...
//!
//! Processed 1 of 2 images into processed/
//! ```
//!
//! ## Session summary
//!
//! ```text
//! Session summary
//!     Printed: 3
//!     Unconfirmed: 0
//!     Queued: 1
//!     Dropped: 0
//! Pending
//!     late.jpg
//! Errors (1 total, last 5)
//!     14:02:11 SubmissionFailed processing late.jpg: queue rejected job
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::BatchReport;
use crate::naming::display_name;
use crate::pipeline::SessionSummary;
use crate::printer::PrinterStatus;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Status
// ============================================================================

pub fn format_status(status: &PrinterStatus) -> Vec<String> {
    let mut lines = vec![format!("Printer {}", status.name)];
    let readiness = if status.is_ready() { "ready" } else { "not ready" };
    lines.push(format!("{}State: {} ({})", indent(1), status.state, readiness));
    if !status.reasons.is_empty() {
        lines.push(format!("{}Reasons: {}", indent(1), status.reasons.join(", ")));
    }
    if let Some(description) = &status.description {
        lines.push(format!("{}Description: {}", indent(1), description));
    }
    if let Some(location) = &status.location {
        lines.push(format!("{}Location: {}", indent(1), location));
    }
    lines
}

pub fn print_status(status: &PrinterStatus) {
    print_lines(format_status(status));
}

// ============================================================================
// Batch
// ============================================================================

/// One line per output in input order, failures with an indented error.
pub fn format_batch_report(report: &BatchReport, output_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut index = 0;

    for output in &report.processed {
        index += 1;
        let source_name = display_name(output)
            .strip_prefix(crate::naming::PROCESSED_PREFIX)
            .map(str::to_string)
            .unwrap_or_else(|| display_name(output));
        lines.push(format!(
            "{} {} → {}",
            format_index(index),
            source_name,
            display_name(output)
        ));
    }
    for (source, error) in &report.failed {
        index += 1;
        lines.push(format!("{} {}", format_index(index), display_name(source)));
        lines.push(format!("{}Error: {}", indent(1), error));
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Processed {} of {} images into {}",
        report.processed.len(),
        report.total(),
        output_dir.display()
    ));
    lines
}

pub fn print_batch_report(report: &BatchReport, output_dir: &Path) {
    print_lines(format_batch_report(report, output_dir));
}

// ============================================================================
// Session summary
// ============================================================================

pub fn format_session_summary(summary: &SessionSummary) -> Vec<String> {
    let stats = &summary.stats;
    let mut lines = vec![
        "Session summary".to_string(),
        format!("{}Printed: {}", indent(1), stats.printed),
        format!("{}Unconfirmed: {}", indent(1), stats.unconfirmed),
        format!("{}Queued: {}", indent(1), stats.queued),
        format!("{}Dropped: {}", indent(1), stats.dropped),
    ];

    if !summary.pending.is_empty() {
        lines.push("Pending".to_string());
        for path in &summary.pending {
            lines.push(format!("{}{}", indent(1), display_name(path)));
        }
    }

    if summary.errors.total > 0 {
        lines.push(format!(
            "Errors ({} total, last {})",
            summary.errors.total,
            summary.errors.recent.len()
        ));
        for record in &summary.errors.recent {
            lines.push(format!(
                "{}{} {} {}: {}",
                indent(1),
                record.at.format("%H:%M:%S"),
                record.kind,
                record.context,
                record.message
            ));
        }
    }
    lines
}

pub fn print_session_summary(summary: &SessionSummary) {
    print_lines(format_session_summary(summary));
}
