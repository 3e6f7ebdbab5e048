//! Watch-folder intake: raw filesystem events in, qualifying file paths out.
//!
//! ```text
//! notify callback thread          control loop
//! ──────────────────────          ────────────
//! FolderMonitor ──WatchEvent──▶ crossbeam channel ──▶ Deduplicator::handle ──▶ process
//! ```
//!
//! The [`FolderMonitor`] only translates and forwards. All filtering
//! (extension, zero size, vanished file, repeated modify) happens in the
//! [`Deduplicator`] on the receiving side, so backlog files found by
//! [`scan_existing`] go through exactly the same rules as live events.

mod dedup;
mod monitor;

pub use dedup::{Deduplicator, Handled, Skip};
pub use monitor::{FolderMonitor, WatchError, classify};

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What the notifier observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Modified,
}

/// One filesystem notification, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: EventKind,
    pub timestamp: DateTime<Local>,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp: Local::now(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Created)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Modified)
    }
}

/// Files already sitting in `dir` when the service starts.
///
/// Only direct children are considered. Results are sorted by file name so
/// the backlog prints in a stable order. Unreadable entries are skipped;
/// a missing directory yields an empty list.
pub fn scan_existing(dir: &Path, supported: &[String]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| crate::naming::has_supported_extension(entry.path(), supported))
        .filter(|entry| entry.metadata().map(|m| m.len() > 0).unwrap_or(false))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exts() -> Vec<String> {
        vec!["jpg".into(), "png".into()]
    }

    #[test]
    fn scan_existing_filters_and_sorts() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("b.png"), b"data").unwrap();
        fs::write(tmp.path().join("a.JPG"), b"data").unwrap();
        fs::write(tmp.path().join("empty.jpg"), b"").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"data").unwrap();
        fs::create_dir(tmp.path().join("sub.jpg")).unwrap();
        fs::write(tmp.path().join("sub.jpg").join("nested.jpg"), b"data").unwrap();

        let found = scan_existing(tmp.path(), &exts());
        let names: Vec<String> = found
            .iter()
            .map(|p| crate::naming::display_name(p))
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);
    }

    #[test]
    fn scan_missing_dir_is_empty() {
        assert!(scan_existing(Path::new("/nonexistent/watch"), &exts()).is_empty());
    }

    #[test]
    fn event_constructors_set_kind() {
        assert_eq!(WatchEvent::created("/a.jpg").kind, EventKind::Created);
        assert_eq!(WatchEvent::modified("/a.jpg").kind, EventKind::Modified);
    }
}
