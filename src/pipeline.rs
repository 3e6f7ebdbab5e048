//! Orchestrator: backlog drain, live events, retry sweep, shutdown.
//!
//! ```text
//! serve
//!  ├─ drain_backlog          files already in the watch folder
//!  ├─ FolderMonitor::start   notify → channel
//!  └─ run                    recv_timeout loop
//!       ├─ handle_event      Deduplicator → dispatch
//!       └─ sweep_queue       every retry_interval, FIFO, stops at first not-ready
//! ```
//!
//! One file at a time: transform, check readiness, submit, then block on
//! the job until it finishes or the job timeout passes. The control loop
//! owns the [`RetryQueue`]; the seen set is shared through the
//! [`Deduplicator`].
//!
//! Per-file failures never end the loop. Each [`ProcessError`] carries a
//! [`Disposition`] that decides whether the file is dropped, queued for
//! another attempt, or escalated as a critical error.

use crate::config::AppConfig;
use crate::errors::{ErrorSummary, ErrorTracker};
use crate::imaging::{BackendError, ImageBackend, PrintGeometry, prepare_for_print};
use crate::naming::display_name;
use crate::printer::{JobId, JobOutcome, PrintController, PrintDevice, PrinterError};
use crate::queue::{Enqueued, RetryQueue};
use crate::watch::{Deduplicator, FolderMonitor, Handled, WatchError, WatchEvent, scan_existing};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest the loop waits before re-checking the running flag.
const SHUTDOWN_TICK: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Image(#[from] BackendError),
    #[error(transparent)]
    Printer(#[from] PrinterError),
    #[error("Print job {job} for {} {outcome}", path.display())]
    JobFailed {
        path: PathBuf,
        job: JobId,
        outcome: JobOutcome,
    },
}

/// What the orchestrator does with a failed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Give up on this file; a later filesystem event may bring it back.
    Drop,
    /// Put the original on the retry queue.
    Queue,
    /// Give up and report as critical; the environment needs attention.
    Escalate,
}

impl ProcessError {
    pub fn disposition(&self) -> Disposition {
        match self {
            ProcessError::Image(BackendError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Disposition::Drop
            }
            ProcessError::Image(BackendError::Io(_)) => Disposition::Escalate,
            ProcessError::Image(_) => Disposition::Drop,
            ProcessError::Printer(PrinterError::PrinterNotFound { .. }) => Disposition::Escalate,
            ProcessError::Printer(_) => Disposition::Queue,
            ProcessError::JobFailed { .. } => Disposition::Drop,
        }
    }

    /// Short name used in error records.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Image(e) => match e {
                BackendError::Io(_) => "Io",
                BackendError::UnreadableImage { .. } => "UnreadableImage",
                BackendError::EncodeFailed { .. } => "EncodeFailed",
                BackendError::InvalidOutputPath(_) => "InvalidOutputPath",
            },
            ProcessError::Printer(e) => match e {
                PrinterError::DeviceUnavailable(_) => "DeviceUnavailable",
                PrinterError::PrinterNotFound { .. } => "PrinterNotFound",
                PrinterError::SubmissionFailed { .. } => "SubmissionFailed",
                PrinterError::CommandTimedOut { .. } => "CommandTimedOut",
                PrinterError::CommandFailed { .. } => "CommandFailed",
                PrinterError::Io(_) => "Io",
            },
            ProcessError::JobFailed { outcome, .. } => match outcome {
                JobOutcome::Canceled => "JobCanceled",
                _ => "JobAborted",
            },
        }
    }
}

/// Successful result of one pass over a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Job completed. `deleted` reports whether the original was removed.
    Printed { job: JobId, deleted: bool },
    /// Job still pending when the wait ran out; it may finish later.
    Unconfirmed { job: JobId },
    /// Printer not ready; the original should wait in the queue.
    Deferred,
}

/// Counters reported at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub printed: usize,
    pub unconfirmed: usize,
    pub queued: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub stats: SessionStats,
    /// Files still waiting in the retry queue.
    pub pending: Vec<PathBuf>,
    pub errors: ErrorSummary,
}

pub struct Pipeline<B: ImageBackend, D: PrintDevice> {
    config: AppConfig,
    geometry: PrintGeometry,
    backend: B,
    printer: PrintController<D>,
    dedup: Arc<Deduplicator>,
    queue: RetryQueue,
    errors: ErrorTracker,
    stats: SessionStats,
    running: Arc<AtomicBool>,
}

impl<B: ImageBackend, D: PrintDevice> Pipeline<B, D> {
    /// `config` is expected to be validated already.
    pub fn new(config: AppConfig, backend: B, printer: PrintController<D>) -> Self {
        let geometry = PrintGeometry::from_config(&config.image);
        let dedup = Arc::new(Deduplicator::new(config.image.supported_extensions.clone()));
        let queue = RetryQueue::new(config.pipeline.max_queue_len, config.pipeline.max_attempts);
        Self {
            config,
            geometry,
            backend,
            printer,
            dedup,
            queue,
            errors: ErrorTracker::new(),
            stats: SessionStats::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag checked between loop iterations. Clearing it stops [`run`](Self::run).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn printer(&self) -> &PrintController<D> {
        &self.printer
    }

    pub fn dedup(&self) -> &Deduplicator {
        &self.dedup
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    // ------------------------------------------------------------------------
    // Single file
    // ------------------------------------------------------------------------

    /// Transform `source`, then print it if the printer is ready.
    ///
    /// Blocks until the job reaches a terminal state or the job timeout
    /// elapses. Does not touch the queue or the error tracker.
    pub fn process_file(&mut self, source: &Path) -> Result<Processed, ProcessError> {
        self.process(source, true)
    }

    fn process(&mut self, source: &Path, check_ready: bool) -> Result<Processed, ProcessError> {
        let name = display_name(source);
        tracing::info!(file = %name, "processing image");
        let artifact = prepare_for_print(
            &self.backend,
            source,
            &self.config.paths.processed_dir,
            &self.geometry,
        )?;
        tracing::debug!(file = %name, artifact = %artifact.display(), "prepared for print");

        if check_ready && !self.printer.is_ready() {
            return Ok(Processed::Deferred);
        }

        let job = self.printer.submit(&artifact)?;
        let outcome = self.printer.wait_for_completion(
            &job,
            self.config.pipeline.poll_interval(),
            self.config.pipeline.job_timeout(),
        );

        match outcome {
            JobOutcome::Completed => {
                tracing::info!(file = %name, job = %job.id, "print completed");
                let deleted = self.config.pipeline.auto_delete && delete_original(source);
                Ok(Processed::Printed { job: job.id, deleted })
            }
            JobOutcome::TimedOut => {
                tracing::warn!(
                    file = %name,
                    job = %job.id,
                    timeout_secs = self.config.pipeline.job_timeout_secs,
                    "job still pending, no longer watching it"
                );
                Ok(Processed::Unconfirmed { job: job.id })
            }
            JobOutcome::Canceled | JobOutcome::Aborted => Err(ProcessError::JobFailed {
                path: source.to_path_buf(),
                job: job.id,
                outcome,
            }),
        }
    }

    /// Process one file and act on the result.
    ///
    /// Returns `Err` when the file was given up on, so the caller can evict
    /// it from the seen set.
    fn dispatch(&mut self, source: &Path, check_ready: bool) -> Result<(), ProcessError> {
        match self.process(source, check_ready) {
            Ok(Processed::Printed { .. }) => {
                self.queue.settle(source);
                self.stats.printed += 1;
                Ok(())
            }
            Ok(Processed::Unconfirmed { .. }) => {
                self.queue.settle(source);
                self.stats.unconfirmed += 1;
                Ok(())
            }
            Ok(Processed::Deferred) => {
                tracing::warn!(file = %display_name(source), "printer not ready, queuing");
                self.enqueue(source);
                Ok(())
            }
            Err(e) => {
                let context = format!("processing {}", display_name(source));
                match e.disposition() {
                    Disposition::Queue => {
                        self.errors.record(e.kind(), context, &e, false);
                        self.enqueue(source);
                        Ok(())
                    }
                    Disposition::Drop => {
                        self.errors.record(e.kind(), context, &e, false);
                        self.queue.settle(source);
                        self.stats.dropped += 1;
                        Err(e)
                    }
                    Disposition::Escalate => {
                        self.errors.record(e.kind(), context, &e, true);
                        self.queue.settle(source);
                        self.stats.dropped += 1;
                        Err(e)
                    }
                }
            }
        }
    }

    fn enqueue(&mut self, source: &Path) {
        let name = display_name(source);
        match self.queue.push(source.to_path_buf()) {
            Enqueued::Queued { attempt } => {
                self.stats.queued += 1;
                tracing::info!(file = %name, attempt, queue_len = self.queue.len(), "queued for retry");
            }
            Enqueued::AlreadyQueued => {
                tracing::debug!(file = %name, "already queued");
            }
            Enqueued::Dropped(reason) => {
                self.errors
                    .record("RetryDropped", format!("queuing {}", name), &reason, false);
                self.stats.dropped += 1;
                self.dedup.forget(source);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Event sources
    // ------------------------------------------------------------------------

    /// Feed one filesystem event through the deduplicator.
    pub fn handle_event(&mut self, event: &WatchEvent) -> Handled<ProcessError> {
        let dedup = Arc::clone(&self.dedup);
        dedup.handle(event, |path| {
            tracing::info!(file = %display_name(path), kind = ?event.kind, "card image detected");
            self.dispatch(path, true)
        })
    }

    /// Run every qualifying file already in the watch folder once.
    ///
    /// Returns how many files were handed to processing.
    pub fn drain_backlog(&mut self) -> usize {
        let files = scan_existing(
            &self.config.paths.watch_dir,
            &self.config.image.supported_extensions,
        );
        if files.is_empty() {
            return 0;
        }
        tracing::info!(count = files.len(), "processing existing files in watch folder");

        let mut handled = 0;
        for file in files {
            if !self.is_running() {
                break;
            }
            if !matches!(self.handle_event(&WatchEvent::created(file)), Handled::Skipped(_)) {
                handled += 1;
            }
        }
        handled
    }

    /// Reprocess queued files in FIFO order while the printer reports ready.
    ///
    /// Stops at the first not-ready answer; the rest stay queued in order.
    /// Only entries queued before the sweep started are taken, so an entry
    /// that fails again waits for the next sweep. Returns how many entries
    /// were taken off the queue.
    pub fn sweep_queue(&mut self) -> usize {
        let pending = self.queue.len();
        let mut taken = 0;
        while taken < pending && self.is_running() {
            if !self.printer.is_ready() {
                tracing::debug!(remaining = self.queue.len(), "printer not ready, sweep paused");
                break;
            }
            let Some(path) = self.queue.pop_front() else {
                break;
            };
            taken += 1;
            tracing::info!(file = %display_name(&path), "processing queued item");
            if self.dispatch(&path, false).is_err() {
                self.dedup.forget(&path);
            }
        }
        taken
    }

    // ------------------------------------------------------------------------
    // Service loop
    // ------------------------------------------------------------------------

    /// Handle events until the running flag clears or the channel closes,
    /// sweeping the retry queue every `retry_interval`.
    pub fn run(&mut self, events: &Receiver<WatchEvent>) {
        let retry_interval = self.config.pipeline.retry_interval();
        let mut next_sweep = Instant::now() + retry_interval;

        while self.is_running() {
            let wait = next_sweep
                .saturating_duration_since(Instant::now())
                .min(SHUTDOWN_TICK);
            match events.recv_timeout(wait) {
                Ok(event) => {
                    self.handle_event(&event);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("event channel closed");
                    break;
                }
            }
            if Instant::now() >= next_sweep {
                self.sweep_queue();
                next_sweep = Instant::now() + retry_interval;
            }
        }
    }

    /// Full service: ensure folders, drain the backlog, watch, loop, shut down.
    pub fn serve(&mut self) -> Result<SessionSummary, WatchError> {
        let watch_dir = self.config.paths.watch_dir.clone();
        for dir in [&watch_dir, &self.config.paths.processed_dir] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "could not create folder");
            }
        }

        self.drain_backlog();

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut monitor = FolderMonitor::start(&watch_dir, tx)?;
        tracing::info!(dir = %watch_dir.display(), "ready, drop card images into the watch folder");

        self.run(&rx);
        Ok(self.shutdown(Some(&mut monitor)))
    }

    /// Stop watching and report the session.
    pub fn shutdown(&mut self, monitor: Option<&mut FolderMonitor>) -> SessionSummary {
        tracing::info!("stopping");
        self.stop();
        if let Some(monitor) = monitor {
            monitor.stop();
        }

        let summary = SessionSummary {
            stats: self.stats.clone(),
            pending: self.queue.iter().map(Path::to_path_buf).collect(),
            errors: self.errors.summary(),
        };
        if summary.errors.total > 0 {
            tracing::warn!(errors = summary.errors.total, "session ended with errors");
        }
        if !summary.pending.is_empty() {
            tracing::warn!(pending = summary.pending.len(), "files left in retry queue");
        }
        tracing::info!(printed = summary.stats.printed, "stopped");
        summary
    }
}

/// Remove the original after a completed job. Failure is logged only.
fn delete_original(source: &Path) -> bool {
    match std::fs::remove_file(source) {
        Ok(()) => {
            tracing::info!(file = %display_name(source), "deleted original");
            true
        }
        Err(e) => {
            tracing::warn!(file = %display_name(source), error = %e, "could not delete original");
            false
        }
    }
}
