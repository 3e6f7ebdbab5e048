//! CUPS binding via the System V / BSD command-line tools.
//!
//! | Operation | Command |
//! |---|---|
//! | List printers | `lpstat -e` |
//! | Printer status | `lpstat -l -p NAME` |
//! | Submit | `lp -d NAME -t TITLE -o KEY=VALUE … FILE` |
//! | Active jobs | `lpstat -l -o` |
//! | Cancel | `cancel ID` |
//! | Default option | `lpadmin -p NAME -o KEY=VALUE` |
//!
//! Every command runs under a wall-clock limit; a command that overruns is
//! killed and reported as [`PrinterError::CommandTimedOut`].

use super::device::{PrintDevice, PrinterError, PrinterState, PrinterStatus};
use super::job::{JobId, ipp};
use super::options::PrintOptions;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Printing system reached through `lp`, `lpstat`, `cancel`, and `lpadmin`.
pub struct CupsDevice {
    timeout: Duration,
}

impl CupsDevice {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<String, PrinterError> {
        run_with_timeout(program, args, self.timeout)
    }
}

/// Run a command, capturing stdout, killing it if it outlives `timeout`.
///
/// A missing binary means there is no printing system at all and maps to
/// [`PrinterError::DeviceUnavailable`].
pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<String, PrinterError> {
    let command = format!("{} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PrinterError::DeviceUnavailable(format!("`{program}` not found on PATH"))
            }
            _ => PrinterError::Io(e),
        })?;

    // Drain pipes on helper threads so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(%command, "command timed out, killed");
            return Err(PrinterError::CommandTimedOut { command, timeout });
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let out = stdout.map(join_output).unwrap_or_default();
    let err = stderr.map(join_output).unwrap_or_default();
    tracing::trace!(%command, code = ?status.code(), "command finished");

    if status.success() {
        Ok(out)
    } else {
        let message = if err.trim().is_empty() {
            status.to_string()
        } else {
            err.trim().to_string()
        };
        Err(PrinterError::CommandFailed { command, message })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn join_output(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

// ============================================================================
// Output parsing
// ============================================================================

/// Parse `lpstat -e`: one destination per line.
pub fn parse_destinations(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `lpstat -l -p NAME`.
///
/// The first line carries the state (`is idle`, `now printing`,
/// `disabled`); indented lines carry `Description:`, `Location:`, and
/// `Alerts:` (printer-state-reasons).
pub fn parse_printer_status(name: &str, output: &str) -> PrinterStatus {
    let mut status = PrinterStatus::new(name, PrinterState::Unknown);

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("printer ") {
            status.state = if trimmed.contains("is idle") {
                PrinterState::Idle
            } else if trimmed.contains("now printing") {
                PrinterState::Processing
            } else if trimmed.contains("disabled") {
                PrinterState::Stopped
            } else {
                PrinterState::Unknown
            };
        } else if let Some(value) = trimmed.strip_prefix("Description:") {
            status.description = non_empty(value);
        } else if let Some(value) = trimmed.strip_prefix("Location:") {
            status.location = non_empty(value);
        } else if let Some(value) = trimmed.strip_prefix("Alerts:") {
            status.reasons = value
                .split([',', ' '])
                .map(str::trim)
                .filter(|r| !r.is_empty() && *r != "none")
                .map(str::to_string)
                .collect();
        }
    }
    status
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Extract the numeric id from `DEST-123`.
pub fn parse_job_ref(token: &str) -> Option<JobId> {
    let (_, id) = token.rsplit_once('-')?;
    id.parse().ok().map(JobId)
}

/// Parse `lp` output: `request id is Canon_G3070_series-42 (1 file(s))`.
pub fn parse_request_id(output: &str) -> Option<JobId> {
    let rest = output.split("request id is ").nth(1)?;
    let token = rest.split_whitespace().next()?;
    parse_job_ref(token)
}

/// Parse `lpstat -l -o` into job id → IPP state.
///
/// Job lines start at column 0; indented lines below describe that job.
/// `job-printing` marks the one in progress, a hold reason marks it held,
/// anything else is pending.
pub fn parse_active_jobs(output: &str) -> BTreeMap<JobId, u32> {
    let mut jobs = BTreeMap::new();
    let mut current: Option<JobId> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            current = line.split_whitespace().next().and_then(parse_job_ref);
            if let Some(id) = current {
                jobs.insert(id, ipp::PENDING);
            }
            continue;
        }
        let Some(id) = current else { continue };
        let detail = line.trim();
        if detail.contains("job-printing") {
            jobs.insert(id, ipp::PROCESSING);
        } else if detail.contains("job-hold-until") || detail.contains("held") {
            jobs.insert(id, ipp::HELD);
        }
    }
    jobs
}

impl PrintDevice for CupsDevice {
    fn list_printers(&self) -> Result<Vec<String>, PrinterError> {
        match self.run("lpstat", &["-e"]) {
            Ok(out) => Ok(parse_destinations(&out)),
            Err(PrinterError::CommandFailed { message, .. }) => {
                Err(PrinterError::DeviceUnavailable(message))
            }
            Err(e) => Err(e),
        }
    }

    fn printer_status(&self, name: &str) -> Result<PrinterStatus, PrinterError> {
        let out = self.run("lpstat", &["-l", "-p", name])?;
        Ok(parse_printer_status(name, &out))
    }

    fn submit_file(
        &self,
        printer: &str,
        path: &Path,
        title: &str,
        options: &PrintOptions,
    ) -> Result<JobId, PrinterError> {
        let path_arg = path.to_string_lossy();
        let pairs: Vec<String> = options.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let mut args: Vec<&str> = vec!["-d", printer, "-t", title];
        for pair in &pairs {
            args.push("-o");
            args.push(pair);
        }
        args.push("--");
        args.push(&path_arg);

        let out = self.run("lp", &args).map_err(|e| match e {
            PrinterError::CommandFailed { message, .. } => PrinterError::SubmissionFailed {
                path: path.to_path_buf(),
                reason: message,
            },
            other => other,
        })?;

        parse_request_id(&out).ok_or_else(|| PrinterError::SubmissionFailed {
            path: path.to_path_buf(),
            reason: format!("unexpected lp output: {}", out.trim()),
        })
    }

    fn active_jobs(&self) -> Result<BTreeMap<JobId, u32>, PrinterError> {
        let out = self.run("lpstat", &["-l", "-o"])?;
        Ok(parse_active_jobs(&out))
    }

    fn cancel(&self, job: JobId) -> Result<(), PrinterError> {
        self.run("cancel", &[&job.to_string()]).map(|_| ())
    }

    fn set_default_option(&self, printer: &str, key: &str, value: &str) -> Result<(), PrinterError> {
        let pair = format!("{key}={value}");
        self.run("lpadmin", &["-p", printer, "-o", &pair]).map(|_| ())
    }
}
