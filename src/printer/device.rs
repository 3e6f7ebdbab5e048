//! Printing-system trait and shared types.
//!
//! [`PrintDevice`] is the seam between the job lifecycle and the platform
//! printing system. The production implementation is
//! [`CupsDevice`](super::cups::CupsDevice); tests use a scripted fake.

use super::job::JobId;
use super::options::PrintOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrinterError {
    #[error("Printing system unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Printer '{name}' not found. Available: {}", .available.join(", "))]
    PrinterNotFound { name: String, available: Vec<String> },
    #[error("Submitting {} failed: {reason}", path.display())]
    SubmissionFailed { path: PathBuf, reason: String },
    #[error("`{command}` did not finish within {}s", timeout.as_secs())]
    CommandTimedOut { command: String, timeout: Duration },
    #[error("`{command}` failed: {message}")]
    CommandFailed { command: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse printer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
    Unknown,
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrinterState::Idle => "idle",
            PrinterState::Processing => "processing",
            PrinterState::Stopped => "stopped",
            PrinterState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterStatus {
    pub name: String,
    pub state: PrinterState,
    pub reasons: Vec<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl PrinterStatus {
    pub fn new(name: impl Into<String>, state: PrinterState) -> Self {
        Self {
            name: name.into(),
            state,
            reasons: Vec::new(),
            description: None,
            location: None,
        }
    }

    /// Only an idle printer accepts a new card.
    pub fn is_ready(&self) -> bool {
        self.state == PrinterState::Idle
    }
}

/// Operations the core needs from the printing system.
///
/// Options are passed through verbatim; unknown keys are the printing
/// system's concern.
pub trait PrintDevice {
    fn list_printers(&self) -> Result<Vec<String>, PrinterError>;

    fn printer_status(&self, name: &str) -> Result<PrinterStatus, PrinterError>;

    fn submit_file(
        &self,
        printer: &str,
        path: &Path,
        title: &str,
        options: &PrintOptions,
    ) -> Result<JobId, PrinterError>;

    /// Every job the system still tracks, with its numeric IPP state.
    fn active_jobs(&self) -> Result<BTreeMap<JobId, u32>, PrinterError>;

    fn cancel(&self, job: JobId) -> Result<(), PrinterError>;

    /// Persist a default option on the printer queue (e.g. page size).
    fn set_default_option(&self, printer: &str, key: &str, value: &str) -> Result<(), PrinterError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::printer::job::ipp;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted in-memory printing system.
    ///
    /// Clones share state, so a test can keep a handle while a controller
    /// owns another.
    #[derive(Clone, Default)]
    pub struct FakeDevice {
        pub state: Arc<Mutex<FakeState>>,
    }

    #[derive(Default)]
    pub struct FakeState {
        pub printers: Vec<String>,
        /// Status answers consumed front to back; the last one repeats.
        pub statuses: VecDeque<PrinterState>,
        /// Per-job scripted listing codes, consumed front to back. `None`
        /// means the job has left the listing.
        pub job_scripts: BTreeMap<JobId, VecDeque<Option<u32>>>,
        pub submitted: Vec<(String, PathBuf, String, PrintOptions)>,
        pub canceled: Vec<JobId>,
        pub defaults: Vec<(String, String, String)>,
        pub fail_submit: bool,
        pub fail_list: bool,
        pub next_id: u32,
    }

    impl FakeDevice {
        pub fn with_printers(names: &[&str]) -> Self {
            let device = Self::default();
            {
                let mut s = device.state.lock().unwrap();
                s.printers = names.iter().map(|n| n.to_string()).collect();
                s.statuses.push_back(PrinterState::Idle);
                s.next_id = 100;
            }
            device
        }

        pub fn script_status(&self, states: &[PrinterState]) {
            let mut s = self.state.lock().unwrap();
            s.statuses = states.iter().copied().collect();
        }

        pub fn script_job(&self, id: JobId, codes: &[Option<u32>]) {
            let mut s = self.state.lock().unwrap();
            s.job_scripts.insert(id, codes.iter().copied().collect());
        }

        pub fn submitted_paths(&self) -> Vec<PathBuf> {
            let s = self.state.lock().unwrap();
            s.submitted.iter().map(|(_, p, _, _)| p.clone()).collect()
        }
    }

    impl PrintDevice for FakeDevice {
        fn list_printers(&self) -> Result<Vec<String>, PrinterError> {
            let s = self.state.lock().unwrap();
            if s.fail_list {
                return Err(PrinterError::DeviceUnavailable("scheduler not running".into()));
            }
            Ok(s.printers.clone())
        }

        fn printer_status(&self, name: &str) -> Result<PrinterStatus, PrinterError> {
            let mut s = self.state.lock().unwrap();
            let state = if s.statuses.len() > 1 {
                s.statuses.pop_front().unwrap_or(PrinterState::Unknown)
            } else {
                s.statuses.front().copied().unwrap_or(PrinterState::Unknown)
            };
            Ok(PrinterStatus::new(name, state))
        }

        fn submit_file(
            &self,
            printer: &str,
            path: &Path,
            title: &str,
            options: &PrintOptions,
        ) -> Result<JobId, PrinterError> {
            let mut s = self.state.lock().unwrap();
            if s.fail_submit {
                return Err(PrinterError::SubmissionFailed {
                    path: path.to_path_buf(),
                    reason: "queue rejected job".into(),
                });
            }
            s.submitted.push((
                printer.to_string(),
                path.to_path_buf(),
                title.to_string(),
                options.clone(),
            ));
            s.next_id += 1;
            Ok(JobId(s.next_id))
        }

        fn active_jobs(&self) -> Result<BTreeMap<JobId, u32>, PrinterError> {
            let mut s = self.state.lock().unwrap();
            let mut listing = BTreeMap::new();
            for (id, script) in s.job_scripts.iter_mut() {
                let code = if script.len() > 1 {
                    script.pop_front().flatten()
                } else {
                    script.front().copied().flatten()
                };
                if let Some(code) = code {
                    listing.insert(*id, code);
                }
            }
            for id in s.canceled.clone() {
                listing.remove(&id);
            }
            Ok(listing)
        }

        fn cancel(&self, job: JobId) -> Result<(), PrinterError> {
            self.state.lock().unwrap().canceled.push(job);
            Ok(())
        }

        fn set_default_option(&self, printer: &str, key: &str, value: &str) -> Result<(), PrinterError> {
            self.state
                .lock()
                .unwrap()
                .defaults
                .push((printer.into(), key.into(), value.into()));
            Ok(())
        }
    }

    #[test]
    fn fake_scripts_job_listing() {
        let device = FakeDevice::with_printers(&["P"]);
        device.script_job(JobId(1), &[Some(ipp::PROCESSING), None]);
        assert_eq!(device.active_jobs().unwrap().get(&JobId(1)), Some(&ipp::PROCESSING));
        assert!(device.active_jobs().unwrap().is_empty());
        assert!(device.active_jobs().unwrap().is_empty());
    }

    #[test]
    fn status_readiness() {
        assert!(PrinterStatus::new("P", PrinterState::Idle).is_ready());
        assert!(!PrinterStatus::new("P", PrinterState::Processing).is_ready());
        assert!(!PrinterStatus::new("P", PrinterState::Stopped).is_ready());
        assert!(!PrinterStatus::new("P", PrinterState::Unknown).is_ready());
    }

    #[test]
    fn not_found_lists_available_printers() {
        let err = PrinterError::PrinterNotFound {
            name: "Canon".into(),
            available: vec!["HP".into(), "Epson".into()],
        };
        assert_eq!(err.to_string(), "Printer 'Canon' not found. Available: HP, Epson");
    }
}
