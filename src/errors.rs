//! Session error tracking.
//!
//! Every recoverable failure is logged where it happens and recorded here so
//! the end-of-session summary can report a count and the most recent ones.

use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Records kept in memory.
pub const MAX_RECORDS: usize = 10;
/// Records shown in a summary.
pub const SUMMARY_RECENT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Short classification, e.g. `UnreadableImage`.
    pub kind: String,
    /// What was being done, e.g. `processing card.jpg`.
    pub context: String,
    pub message: String,
    pub at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSummary {
    pub total: usize,
    pub recent: Vec<ErrorRecord>,
}

#[derive(Debug, Default)]
pub struct ErrorTracker {
    total: usize,
    records: VecDeque<ErrorRecord>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and remember an error. `critical` escalates the log level.
    pub fn record(
        &mut self,
        kind: impl Into<String>,
        context: impl Into<String>,
        error: &dyn std::fmt::Display,
        critical: bool,
    ) {
        let record = ErrorRecord {
            kind: kind.into(),
            context: context.into(),
            message: error.to_string(),
            at: Local::now(),
        };
        if critical {
            tracing::error!(kind = %record.kind, context = %record.context, "critical: {}", record.message);
        } else {
            tracing::warn!(kind = %record.kind, context = %record.context, "{}", record.message);
        }

        self.total += 1;
        if self.records.len() == MAX_RECORDS {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn summary(&self) -> ErrorSummary {
        let skip = self.records.len().saturating_sub(SUMMARY_RECENT);
        ErrorSummary {
            total: self.total,
            recent: self.records.iter().skip(skip).cloned().collect(),
        }
    }
}
