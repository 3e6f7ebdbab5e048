//! `notify` binding: forwards create/modify notifications for one folder.

use super::{EventKind, WatchEvent};
use crossbeam_channel::Sender;
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("Filesystem watch failed: {0}")]
    Notify(#[from] notify::Error),
}

/// Map a notify event kind onto the two kinds the pipeline cares about.
///
/// A rename into the folder counts as a creation. A close-after-write
/// (inotify only) counts as a modification, which gives files that were
/// still being written at creation time a final chance to qualify.
pub fn classify(kind: &notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(EventKind::Created),
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(EventKind::Created),
        notify::EventKind::Modify(ModifyKind::Name(_)) => None,
        notify::EventKind::Modify(_) => Some(EventKind::Modified),
        notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            Some(EventKind::Modified)
        }
        _ => None,
    }
}

/// Non-recursive watch on a single folder.
///
/// Events are delivered on notify's own thread and sent into the channel;
/// the receiver side does all filtering. Dropping the monitor stops it.
pub struct FolderMonitor {
    dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl FolderMonitor {
    pub fn start(dir: &Path, tx: Sender<WatchEvent>) -> Result<Self, WatchError> {
        if !dir.is_dir() {
            return Err(WatchError::MissingDirectory(dir.to_path_buf()));
        }

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let Some(kind) = classify(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if tx.send(WatchEvent::new(path, kind)).is_err() {
                            tracing::debug!("event receiver closed, dropping notification");
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "filesystem watch error"),
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::info!(dir = %dir.display(), "monitoring folder");

        Ok(Self {
            dir: dir.to_path_buf(),
            watcher: Some(watcher),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Stop watching. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.dir) {
                tracing::debug!(error = %e, "unwatch failed");
            }
            tracing::info!(dir = %self.dir.display(), "folder monitoring stopped");
        }
    }
}

impl Drop for FolderMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::time::{Duration, Instant};

    #[test]
    fn classify_create_and_modify() {
        assert_eq!(
            classify(&notify::EventKind::Create(CreateKind::File)),
            Some(EventKind::Created)
        );
        assert_eq!(
            classify(&notify::EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(EventKind::Modified)
        );
        assert_eq!(
            classify(&notify::EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            Some(EventKind::Modified)
        );
    }

    #[test]
    fn classify_rename_into_folder_as_created() {
        assert_eq!(
            classify(&notify::EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(EventKind::Created)
        );
        assert_eq!(
            classify(&notify::EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            None
        );
    }

    #[test]
    fn classify_ignores_removal_and_reads() {
        assert_eq!(classify(&notify::EventKind::Remove(RemoveKind::File)), None);
        assert_eq!(
            classify(&notify::EventKind::Access(AccessKind::Close(AccessMode::Read))),
            None
        );
    }

    #[test]
    fn start_on_missing_dir_fails() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let result = FolderMonitor::start(Path::new("/nonexistent/watch"), tx);
        assert!(matches!(result, Err(WatchError::MissingDirectory(_))));
    }

    #[test]
    fn new_file_is_forwarded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut monitor = FolderMonitor::start(tmp.path(), tx).unwrap();
        assert!(monitor.is_running());

        let file = tmp.path().join("card.jpg");
        std::fs::write(&file, b"pixels").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(event) if event.path.file_name() == file.file_name() => {
                    seen = true;
                    break;
                }
                _ => continue,
            }
        }
        assert!(seen, "no event for {}", file.display());

        monitor.stop();
        assert!(!monitor.is_running());
        monitor.stop();
    }
}
