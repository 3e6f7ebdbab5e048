//! Event deduplication: at most one processing hand-off per file per acceptance.

use super::{EventKind, WatchEvent};
use crate::naming::has_supported_extension;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Why an event did not reach the processing callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Directory,
    UnsupportedExtension,
    /// Metadata read failed, usually because the file vanished.
    Vanished,
    /// Zero bytes: the writer has not flushed anything yet.
    Empty,
    /// Repeated modify for a path already accepted.
    AlreadySeen,
}

/// Result of feeding one event through the deduplicator.
#[derive(Debug, PartialEq, Eq)]
pub enum Handled<E> {
    /// Callback ran and succeeded; the path stays in the seen set.
    Processed,
    /// Callback ran and failed; the path was evicted so a later event can retry.
    Failed(E),
    Skipped(Skip),
}

/// Filters raw events and guards the seen set.
///
/// The seen set sits behind a mutex because both the event path and the
/// retry sweep can touch it.
pub struct Deduplicator {
    supported: Vec<String>,
    seen: Mutex<HashSet<PathBuf>>,
}

impl Deduplicator {
    /// `supported` must already be lowercase without leading dots
    /// (as produced by config validation).
    pub fn new(supported: Vec<String>) -> Self {
        Self {
            supported,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Decide whether `event` qualifies, without touching the seen set.
    pub fn check(&self, event: &WatchEvent) -> Result<(), Skip> {
        let path = &event.path;
        if !has_supported_extension(path, &self.supported) {
            return Err(Skip::UnsupportedExtension);
        }
        let metadata = std::fs::metadata(path).map_err(|_| Skip::Vanished)?;
        if metadata.is_dir() {
            return Err(Skip::Directory);
        }
        if metadata.len() == 0 {
            return Err(Skip::Empty);
        }
        if event.kind == EventKind::Modified && self.is_seen(path) {
            return Err(Skip::AlreadySeen);
        }
        Ok(())
    }

    /// Run `process` for a qualifying event.
    ///
    /// The path joins the seen set before the callback runs and leaves it
    /// again if the callback returns an error.
    pub fn handle<E, F>(&self, event: &WatchEvent, process: F) -> Handled<E>
    where
        F: FnOnce(&Path) -> Result<(), E>,
    {
        if let Err(skip) = self.check(event) {
            tracing::trace!(file = %event.path.display(), ?skip, "event skipped");
            return Handled::Skipped(skip);
        }

        self.seen.lock().insert(event.path.clone());
        match process(&event.path) {
            Ok(()) => Handled::Processed,
            Err(e) => {
                self.forget(&event.path);
                Handled::Failed(e)
            }
        }
    }

    pub fn is_seen(&self, path: &Path) -> bool {
        self.seen.lock().contains(path)
    }

    /// Evict a path so the next event for it is accepted again.
    pub fn forget(&self, path: &Path) -> bool {
        self.seen.lock().remove(path)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;

    fn dedup() -> Deduplicator {
        Deduplicator::new(vec!["jpg".into(), "jpeg".into(), "png".into()])
    }

    fn write_card(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not empty").unwrap();
        path
    }

    // =========================================================================
    // Qualification
    // =========================================================================

    #[test]
    fn directory_events_are_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("folder.jpg");
        fs::create_dir(&dir).unwrap();
        let result = dedup().handle(&WatchEvent::created(&dir), |_| Ok::<_, ()>(()));
        assert_eq!(result, Handled::Skipped(Skip::Directory));
    }

    #[test]
    fn plain_directory_is_skipped_and_not_seen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("new_set");
        fs::create_dir(&dir).unwrap();
        let d = dedup();
        let result = d.handle(&WatchEvent::modified(&dir), |_| Ok::<_, ()>(()));
        assert!(matches!(result, Handled::Skipped(_)));
        assert!(!d.is_seen(&dir));
    }

    #[test]
    fn unsupported_extension_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "notes.txt");
        let result = dedup().handle(&WatchEvent::created(&path), |_| Ok::<_, ()>(()));
        assert_eq!(result, Handled::Skipped(Skip::UnsupportedExtension));
    }

    #[test]
    fn extension_check_ignores_case() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "CARD.JPG");
        let result = dedup().handle(&WatchEvent::created(&path), |_| Ok::<_, ()>(()));
        assert_eq!(result, Handled::Processed);
    }

    #[test]
    fn empty_file_is_skipped_and_not_seen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("card.jpg");
        fs::write(&path, b"").unwrap();
        let d = dedup();
        assert_eq!(
            d.handle(&WatchEvent::created(&path), |_| Ok::<_, ()>(())),
            Handled::Skipped(Skip::Empty)
        );
        assert!(!d.is_seen(&path));
    }

    #[test]
    fn vanished_file_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("gone.png");
        let result = dedup().handle(&WatchEvent::modified(&path), |_| Ok::<_, ()>(()));
        assert_eq!(result, Handled::Skipped(Skip::Vanished));
    }

    // =========================================================================
    // Seen-set behaviour
    // =========================================================================

    #[test]
    fn duplicate_modify_does_not_reprocess() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "card.jpg");
        let d = dedup();
        let calls = Cell::new(0);
        let count = |_: &Path| {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(())
        };

        assert_eq!(d.handle(&WatchEvent::created(&path), count), Handled::Processed);
        assert_eq!(
            d.handle(&WatchEvent::modified(&path), count),
            Handled::Skipped(Skip::AlreadySeen)
        );
        assert_eq!(
            d.handle(&WatchEvent::modified(&path), count),
            Handled::Skipped(Skip::AlreadySeen)
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn created_always_processes_even_when_seen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "card.jpg");
        let d = dedup();
        let calls = Cell::new(0);
        let count = |_: &Path| {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(())
        };

        d.handle(&WatchEvent::created(&path), count);
        d.handle(&WatchEvent::created(&path), count);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn path_is_seen_while_callback_runs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "card.jpg");
        let d = dedup();
        let observed = Cell::new(false);
        d.handle(&WatchEvent::created(&path), |p| {
            observed.set(d.is_seen(p));
            Ok::<_, ()>(())
        });
        assert!(observed.get());
    }

    #[test]
    fn failure_evicts_and_next_modify_retries() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "card.png");
        let d = dedup();

        let first = d.handle(&WatchEvent::created(&path), |_| Err("decode failed"));
        assert_eq!(first, Handled::Failed("decode failed"));
        assert!(!d.is_seen(&path));

        let second = d.handle(&WatchEvent::modified(&path), |_| Ok::<_, &str>(()));
        assert_eq!(second, Handled::Processed);
        assert!(d.is_seen(&path));
    }

    #[test]
    fn forget_reports_membership() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_card(tmp.path(), "card.jpg");
        let d = dedup();
        assert!(!d.forget(&path));
        d.handle(&WatchEvent::created(&path), |_| Ok::<_, ()>(()));
        assert_eq!(d.seen_count(), 1);
        assert!(d.forget(&path));
        assert_eq!(d.seen_count(), 0);
    }
}
