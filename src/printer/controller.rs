//! Print controller: one resolved printer, its default options, and the
//! submit → poll → outcome lifecycle on top of a [`PrintDevice`].

use super::device::{PrintDevice, PrinterError, PrinterStatus};
use super::job::{JobId, JobOutcome, JobState, PrintJob};
use super::options::PrintOptions;
use crate::config::PrinterConfig;
use crate::naming::{JOB_TITLE_NOUN, job_title};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

/// Pick the printer to use from what the system reports.
///
/// Exact `name` first; otherwise the first printer whose name contains every
/// entry of `match_hint`.
pub fn resolve_printer(config: &PrinterConfig, available: &[String]) -> Result<String, PrinterError> {
    if !config.name.is_empty() && available.iter().any(|p| *p == config.name) {
        return Ok(config.name.clone());
    }
    if !config.match_hint.is_empty() {
        if let Some(found) = available
            .iter()
            .find(|p| config.match_hint.iter().all(|hint| p.contains(hint.as_str())))
        {
            return Ok(found.clone());
        }
    }
    let name = if config.name.is_empty() {
        config.match_hint.join(" ")
    } else {
        config.name.clone()
    };
    Err(PrinterError::PrinterNotFound {
        name,
        available: available.to_vec(),
    })
}

pub struct PrintController<D: PrintDevice> {
    device: D,
    printer: String,
    config: PrinterConfig,
    options: PrintOptions,
    canceled: HashSet<JobId>,
}

impl<D: PrintDevice> PrintController<D> {
    /// Resolve the configured printer on `device`.
    ///
    /// Fails when the printing system cannot be reached or no printer
    /// matches; callers treat either as fatal at startup.
    pub fn connect(device: D, config: &PrinterConfig) -> Result<Self, PrinterError> {
        let available = device.list_printers()?;
        let printer = resolve_printer(config, &available)?;
        if printer != config.name {
            tracing::info!(printer = %printer, configured = %config.name, "matched printer by name hint");
        }
        tracing::info!(printer = %printer, "connected to printer");
        Ok(Self {
            device,
            printer,
            config: config.clone(),
            options: PrintOptions::from_config(config),
            canceled: HashSet::new(),
        })
    }

    pub fn printer_name(&self) -> &str {
        &self.printer
    }

    /// Options every submission starts from.
    pub fn default_options(&self) -> &PrintOptions {
        &self.options
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn status(&self) -> Result<PrinterStatus, PrinterError> {
        self.device.printer_status(&self.printer)
    }

    /// A failed status query counts as not ready.
    pub fn is_ready(&self) -> bool {
        match self.status() {
            Ok(status) => status.is_ready(),
            Err(e) => {
                tracing::warn!(printer = %self.printer, error = %e, "status query failed");
                false
            }
        }
    }

    /// Submit `path` with the default options.
    pub fn submit(&self, path: &Path) -> Result<PrintJob, PrinterError> {
        self.submit_with(path, &self.options)
    }

    pub fn submit_with(&self, path: &Path, options: &PrintOptions) -> Result<PrintJob, PrinterError> {
        if !path.is_file() {
            return Err(PrinterError::SubmissionFailed {
                path: path.to_path_buf(),
                reason: "file not found".into(),
            });
        }
        let title = job_title(path);
        let id = self.device.submit_file(&self.printer, path, &title, options)?;
        tracing::info!(job = %id, file = %path.display(), "print job submitted");
        Ok(PrintJob::new(id, path, title))
    }

    /// Current state of `job`.
    pub fn poll(&self, job: JobId) -> Result<JobState, PrinterError> {
        let listing = self.device.active_jobs()?;
        let state = JobState::from_listing(listing.get(&job).copied());
        if state == JobState::Completed && self.canceled.contains(&job) {
            return Ok(JobState::Canceled);
        }
        Ok(state)
    }

    pub fn cancel(&mut self, job: JobId) -> Result<(), PrinterError> {
        self.device.cancel(job)?;
        self.canceled.insert(job);
        tracing::info!(job = %job, "print job canceled");
        Ok(())
    }

    /// Poll `job` every `interval` until it reaches a terminal state or
    /// `timeout` elapses. Poll errors are logged and polling continues.
    pub fn wait_for_completion(&self, job: &PrintJob, interval: Duration, timeout: Duration) -> JobOutcome {
        let started = Instant::now();
        loop {
            match self.poll(job.id) {
                Ok(state) => {
                    tracing::debug!(job = %job.id, ?state, "job polled");
                    if let Some(outcome) = JobOutcome::from_state(state) {
                        return outcome;
                    }
                }
                Err(e) => tracing::warn!(job = %job.id, error = %e, "job poll failed"),
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return JobOutcome::TimedOut;
            }
            std::thread::sleep(interval.min(timeout - elapsed));
        }
    }

    /// Register the card page size as the printer default.
    ///
    /// Not available on macOS, where instructions are logged instead.
    /// Failure is only a warning.
    pub fn setup_custom_paper_size(&self) {
        if !self.config.setup_page_size {
            return;
        }
        let page_size = &self.config.page_size;
        tracing::info!(page_size = %page_size, "setting up custom paper size");

        if cfg!(target_os = "macos") {
            tracing::info!("add the card size manually: System Settings > Printers & Scanners > {} > Options > Custom Size", self.printer);
            tracing::info!("name: {JOB_TITLE_NOUN}, width 2.5 in (63.5 mm), height 3.5 in (88.9 mm), margins 0.1 in (2.54 mm)");
            return;
        }

        match self.device.set_default_option(&self.printer, "PageSize", page_size) {
            Ok(()) => tracing::info!(printer = %self.printer, "custom paper size configured"),
            Err(e) => {
                tracing::warn!(printer = %self.printer, error = %e, "could not set custom paper size");
                tracing::info!("configure the custom paper size manually in the printer settings");
            }
        }
    }
}
