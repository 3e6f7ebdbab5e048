//! Print job lifecycle: identifiers, states, and terminal outcomes.
//!
//! ```text
//! Submitted ──▶ { Active, Held } ──▶ { Completed, Canceled, Aborted }
//! ```
//!
//! The device keeps no record of finished jobs, so a job that disappears
//! from the active listing is taken as [`JobState::Completed`]. This is a
//! heuristic: a job removed by another client looks exactly the same.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;

/// IPP `job-state` values as reported by the printing system.
pub mod ipp {
    pub const PENDING: u32 = 3;
    pub const HELD: u32 = 4;
    pub const PROCESSING: u32 = 5;
    pub const STOPPED: u32 = 6;
    pub const CANCELED: u32 = 7;
    pub const ABORTED: u32 = 8;
    pub const COMPLETED: u32 = 9;
}

/// Codes at or above this are treated as a failed job.
pub const ABORT_THRESHOLD: u32 = ipp::CANCELED;

/// Device-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Active,
    Held,
    Completed,
    Canceled,
    Aborted,
}

impl JobState {
    /// Resolve a state from the job's entry in the active listing.
    ///
    /// `None` (absent from the listing) resolves to `Completed`.
    pub fn from_listing(code: Option<u32>) -> Self {
        match code {
            None => JobState::Completed,
            Some(c) if c >= ABORT_THRESHOLD => JobState::Aborted,
            Some(ipp::HELD) => JobState::Held,
            Some(ipp::PENDING) => JobState::Submitted,
            Some(_) => JobState::Active,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Canceled | JobState::Aborted
        )
    }
}

/// How waiting on a job ended.
///
/// `TimedOut` is inconclusive, not a failure: the job may still finish
/// after this process stops watching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Canceled,
    Aborted,
    TimedOut,
}

impl JobOutcome {
    pub fn from_state(state: JobState) -> Option<Self> {
        match state {
            JobState::Completed => Some(JobOutcome::Completed),
            JobState::Canceled => Some(JobOutcome::Canceled),
            JobState::Aborted => Some(JobOutcome::Aborted),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == JobOutcome::Completed
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Canceled => "canceled",
            JobOutcome::Aborted => "aborted",
            JobOutcome::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// A submitted job. Lives only until its outcome is known.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: JobId,
    pub source: PathBuf,
    pub title: String,
    pub submitted_at: DateTime<Local>,
}

impl PrintJob {
    pub fn new(id: JobId, source: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            title: title.into(),
            submitted_at: Local::now(),
        }
    }
}
