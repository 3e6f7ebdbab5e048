//! Application configuration.
//!
//! Handles loading, merging, and validating `config.toml`. Stock defaults are
//! the base layer; the user's file and any command-line overrides are merged
//! on top, and the merged result is validated once before anything starts.
//! The resulting [`AppConfig`] is immutable and passed by reference into every
//! component constructor.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! watch_dir = "tcg_cards_input"   # Folder watched for new card images
//! processed_dir = "processed"     # Where print-ready images are written
//! log_dir = "logs"                # Log file location
//!
//! [image]
//! target_width = 750              # 2.5in at 300 DPI
//! target_height = 1050            # 3.5in at 300 DPI
//! dpi = 300
//! jpeg_quality = 95
//! optimize_for_print = true       # Auto-contrast + mild sharpening
//! supported_extensions = ["jpg", "jpeg", "png", "bmp", "tiff"]
//!
//! [printer]
//! name = "Canon_G3070_series"
//! match_hint = ["Canon", "G3270"] # Partial-name fallback
//! media_type = "Cardstock"
//! page_size = "Custom.2.5x3.5in"
//! resolution = "300dpi"
//! color_model = "RGB"
//! fit_to_page = false
//! scaling = 100
//! command_timeout_secs = 5
//! setup_page_size = true
//!
//! [printer.options]               # Extra device options, passed verbatim
//!
//! [pipeline]
//! auto_delete = false
//! poll_interval_secs = 2
//! job_timeout_secs = 60
//! retry_interval_secs = 5
//! max_queue_len = 100
//! max_attempts = 5
//!
//! [logging]
//! level = "info"
//! file = true
//! max_files = 7                   # Daily log files kept
//!
//! [processing]
//! max_processes = 4               # Batch workers (omit for auto = CPU cores)
//! ```
//!
//! Relative paths are resolved against the working directory. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete application configuration.
///
/// All fields have defaults matching a Canon G3000-series printer loaded with
/// 2.5×3.5in card stock. User config files need only specify overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub image: ImageConfig,
    pub printer: PrinterConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let image = &self.image;
        if image.target_width == 0 || image.target_height == 0 {
            return Err(ConfigError::Validation(
                "image.target_width and image.target_height must be non-zero".into(),
            ));
        }
        if image.dpi == 0 {
            return Err(ConfigError::Validation("image.dpi must be non-zero".into()));
        }
        if !(1..=100).contains(&image.jpeg_quality) {
            return Err(ConfigError::Validation(
                "image.jpeg_quality must be 1-100".into(),
            ));
        }
        if image.supported_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "image.supported_extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = image
            .supported_extensions
            .iter()
            .find(|e| e.is_empty() || !e.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(ConfigError::Validation(format!(
                "image.supported_extensions contains an invalid entry: {bad:?}"
            )));
        }

        let pipeline = &self.pipeline;
        if pipeline.poll_interval_secs == 0 || pipeline.retry_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "pipeline intervals must be non-zero".into(),
            ));
        }
        if pipeline.job_timeout_secs < pipeline.poll_interval_secs {
            return Err(ConfigError::Validation(
                "pipeline.job_timeout_secs must be at least pipeline.poll_interval_secs".into(),
            ));
        }
        if pipeline.max_queue_len == 0 || pipeline.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "pipeline.max_queue_len and pipeline.max_attempts must be non-zero".into(),
            ));
        }

        if self.logging.max_files == 0 {
            return Err(ConfigError::Validation(
                "logging.max_files must be non-zero".into(),
            ));
        }

        if self.printer.command_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "printer.command_timeout_secs must be non-zero".into(),
            ));
        }
        if self.printer.name.trim().is_empty() && self.printer.match_hint.is_empty() {
            return Err(ConfigError::Validation(
                "printer.name or printer.match_hint must be set".into(),
            ));
        }

        // Output written into the watched folder would be picked up again.
        if self.paths.watch_dir == self.paths.processed_dir {
            return Err(ConfigError::Validation(
                "paths.watch_dir and paths.processed_dir must differ".into(),
            ));
        }
        Ok(())
    }

    /// Normalize user-entered values: extensions lose a leading dot and are
    /// lowercased, duplicates removed (first occurrence wins).
    fn normalize(&mut self) {
        let mut seen = Vec::new();
        for ext in &self.image.supported_extensions {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if !seen.contains(&ext) {
                seen.push(ext);
            }
        }
        self.image.supported_extensions = seen;
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Folder watched for newly dropped card images.
    pub watch_dir: PathBuf,
    /// Folder receiving `print_<name>` artifacts.
    pub processed_dir: PathBuf,
    /// Folder for the log files (when `logging.file` is set).
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("tcg_cards_input"),
            processed_dir: PathBuf::from("processed"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Print geometry and encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Output canvas width in pixels.
    pub target_width: u32,
    /// Output canvas height in pixels.
    pub target_height: u32,
    /// Resolution tag written into the output file.
    pub dpi: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub jpeg_quality: u32,
    /// Apply auto-contrast and sharpening after the geometry transform.
    pub optimize_for_print: bool,
    /// Lowercase extensions (without dot) that qualify a file for printing.
    pub supported_extensions: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            target_width: 750,
            target_height: 1050,
            dpi: 300,
            jpeg_quality: 95,
            optimize_for_print: true,
            supported_extensions: ["jpg", "jpeg", "png", "bmp", "tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Printing device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrinterConfig {
    /// Queue name as installed on the print server.
    pub name: String,
    /// When `name` is not installed, the first printer whose name contains
    /// every one of these fragments is used instead.
    pub match_hint: Vec<String>,
    pub media_type: String,
    pub page_size: String,
    pub resolution: String,
    pub color_model: String,
    pub fit_to_page: bool,
    /// Scaling percentage.
    pub scaling: u32,
    /// Upper bound on any single device command (status, submit, cancel).
    pub command_timeout_secs: u64,
    /// Register `page_size` as the printer default at startup.
    pub setup_page_size: bool,
    /// Additional device options passed through verbatim. These win over
    /// the named fields above.
    pub options: BTreeMap<String, String>,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "Canon_G3070_series".to_string(),
            match_hint: vec!["Canon".to_string(), "G3270".to_string()],
            media_type: "Cardstock".to_string(),
            page_size: "Custom.2.5x3.5in".to_string(),
            resolution: "300dpi".to_string(),
            color_model: "RGB".to_string(),
            fit_to_page: false,
            scaling: 100,
            command_timeout_secs: 5,
            setup_page_size: true,
            options: BTreeMap::new(),
        }
    }
}

impl PrinterConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Orchestration timing and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Delete the original file after its job completes.
    pub auto_delete: bool,
    pub poll_interval_secs: u64,
    /// Give up observing a job after this long. The job itself is not canceled.
    pub job_timeout_secs: u64,
    /// Period of the retry-queue sweep.
    pub retry_interval_secs: u64,
    /// Maximum number of files waiting for the printer.
    pub max_queue_len: usize,
    /// A file queued this many times is dropped instead of queued again.
    pub max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_delete: false,
            poll_interval_secs: 2,
            job_timeout_secs: 60,
            retry_interval_secs: 5,
            max_queue_len: 100,
            max_attempts: 5,
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Also write daily DEBUG and ERROR-only log files into `log_dir`.
    pub file: bool,
    /// Daily files kept per log before the oldest is deleted.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            max_files: 7,
        }
    }
}

/// Parallel processing settings for the `batch` command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays (in order) onto the stock defaults, then deserialize,
/// normalize, and validate.
pub fn resolve_config(overlays: impl IntoIterator<Item = toml::Value>) -> Result<AppConfig, ConfigError> {
    let merged = overlays
        .into_iter()
        .fold(stock_defaults_value(), merge_toml);
    let mut config: AppConfig = merged.try_into()?;
    config.normalize();
    config.validate()?;
    Ok(config)
}

/// Load config from the given file (stock defaults when it does not exist).
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# TCG Card Printer Configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Folders (relative paths resolve against the working directory)
# ---------------------------------------------------------------------------
[paths]
# New card images dropped here are printed automatically.
watch_dir = "tcg_cards_input"
# Print-ready copies are written here as print_<original-name>.
processed_dir = "processed"
# Log file location (see [logging]).
log_dir = "logs"

# ---------------------------------------------------------------------------
# Print geometry
# ---------------------------------------------------------------------------
[image]
# Output canvas in pixels: 2.5 x 3.5 inches at 300 DPI.
target_width = 750
target_height = 1050
dpi = 300
# JPEG encoding quality (1 = worst, 100 = best).
jpeg_quality = 95
# Auto-contrast and mild sharpening for card stock.
optimize_for_print = true
# File types picked up from the watch folder (case-insensitive).
supported_extensions = ["jpg", "jpeg", "png", "bmp", "tiff"]

# ---------------------------------------------------------------------------
# Printer
# ---------------------------------------------------------------------------
[printer]
# Queue name as shown by `lpstat -e`.
name = "Canon_G3070_series"
# Fallback: first printer whose name contains all of these.
match_hint = ["Canon", "G3270"]
media_type = "Cardstock"
page_size = "Custom.2.5x3.5in"
resolution = "300dpi"
color_model = "RGB"
fit_to_page = false
scaling = 100
# Upper bound in seconds on any single printer command.
command_timeout_secs = 5
# Register page_size as the printer default at startup (lpadmin).
setup_page_size = true

# Extra options passed to the printer verbatim; these win over the above.
[printer.options]
# "print-quality" = "5"

# ---------------------------------------------------------------------------
# Pipeline
# ---------------------------------------------------------------------------
[pipeline]
# Delete the original image once its print job completes.
auto_delete = false
# Seconds between job status checks.
poll_interval_secs = 2
# Stop watching a job after this many seconds (the job keeps printing).
job_timeout_secs = 60
# Seconds between retries of images waiting for the printer.
retry_interval_secs = 5
# Maximum images waiting for the printer.
max_queue_len = 100
# Drop an image after it has been queued this many times.
max_attempts = 5

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# Filter directive; RUST_LOG overrides it.
level = "info"
# Also write daily logs into log_dir: tcg-printer.<date>.log (detailed)
# and errors.<date>.log (errors only).
file = true
# Days of each log to keep.
max_files = 7

# ---------------------------------------------------------------------------
# Batch processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for the batch command.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
