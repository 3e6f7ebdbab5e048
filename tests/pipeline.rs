//! End-to-end pipeline runs with the real image backend and an in-memory
//! printing system.
//!
//! Run with: cargo test --test pipeline

use image::{Rgb, RgbImage};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tcg_printer::config::AppConfig;
use tcg_printer::imaging::{ImageBackend, RustBackend};
use tcg_printer::pipeline::{Pipeline, ProcessError};
use tcg_printer::printer::{
    JobId, PrintController, PrintDevice, PrintOptions, PrinterError, PrinterState, PrinterStatus,
};
use tcg_printer::watch::{Handled, Skip, WatchEvent};
use tempfile::TempDir;

const PRINTER: &str = "Canon_G3070_series";

/// Printing system whose jobs finish as soon as they are submitted.
#[derive(Clone, Default)]
struct InstantPrinter {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    /// Readiness answers, front to back; the last one repeats.
    states: VecDeque<PrinterState>,
    submitted: Vec<PathBuf>,
}

impl InstantPrinter {
    fn script(&self, states: &[PrinterState]) {
        self.inner.lock().unwrap().states = states.iter().copied().collect();
    }

    fn submitted_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .submitted
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

impl PrintDevice for InstantPrinter {
    fn list_printers(&self) -> Result<Vec<String>, PrinterError> {
        Ok(vec!["Office_Laser".into(), PRINTER.into()])
    }

    fn printer_status(&self, name: &str) -> Result<PrinterStatus, PrinterError> {
        let mut inner = self.inner.lock().unwrap();
        let state = if inner.states.len() > 1 {
            inner.states.pop_front().unwrap()
        } else {
            inner.states.front().copied().unwrap_or(PrinterState::Idle)
        };
        Ok(PrinterStatus::new(name, state))
    }

    fn submit_file(
        &self,
        _printer: &str,
        path: &Path,
        _title: &str,
        _options: &PrintOptions,
    ) -> Result<JobId, PrinterError> {
        let mut inner = self.inner.lock().unwrap();
        inner.submitted.push(path.to_path_buf());
        Ok(JobId(inner.submitted.len() as u32))
    }

    fn active_jobs(&self) -> Result<BTreeMap<JobId, u32>, PrinterError> {
        Ok(BTreeMap::new())
    }

    fn cancel(&self, _job: JobId) -> Result<(), PrinterError> {
        Ok(())
    }

    fn set_default_option(&self, _printer: &str, _key: &str, _value: &str) -> Result<(), PrinterError> {
        Ok(())
    }
}

struct Studio {
    tmp: TempDir,
    device: InstantPrinter,
    pipeline: Pipeline<RustBackend, InstantPrinter>,
}

impl Studio {
    fn new(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let tmp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.paths.watch_dir = tmp.path().join("tcg_cards_input");
        config.paths.processed_dir = tmp.path().join("processed");
        config.pipeline.poll_interval_secs = 0;
        tweak(&mut config);
        std::fs::create_dir_all(&config.paths.watch_dir).unwrap();

        let device = InstantPrinter::default();
        let printer = PrintController::connect(device.clone(), &config.printer).unwrap();
        let pipeline = Pipeline::new(config, RustBackend::new(), printer);
        Self { tmp, device, pipeline }
    }

    fn input(&self, name: &str) -> PathBuf {
        self.tmp.path().join("tcg_cards_input").join(name)
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.tmp.path().join("processed").join(format!("print_{name}"))
    }

    /// Landscape photo with a red left half and a blue right half.
    fn drop_photo(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([200, 30, 30])
            } else {
                Rgb([30, 30, 200])
            }
        });
        let path = self.input(name);
        img.save(&path).unwrap();
        path
    }
}

// =============================================================================
// Live events
// =============================================================================

#[test]
fn landscape_photo_is_printed_at_card_size() {
    let mut studio = Studio::new(|_| {});
    let source = studio.drop_photo("dragon.jpg", 1600, 900);

    let handled = studio.pipeline.handle_event(&WatchEvent::created(&source));
    assert!(matches!(handled, Handled::Processed));

    let artifact = studio.artifact("dragon.jpg");
    let dims = RustBackend::new().identify(&artifact).unwrap();
    assert_eq!((dims.width, dims.height), (750, 1050));
    assert_eq!(studio.device.submitted_names(), vec!["print_dragon.jpg"]);
    assert_eq!(studio.pipeline.stats().printed, 1);
    assert!(source.exists());
}

#[test]
fn printed_original_is_deleted_when_configured() {
    let mut studio = Studio::new(|c| c.pipeline.auto_delete = true);
    let source = studio.drop_photo("goblin.png", 500, 700);

    studio.pipeline.handle_event(&WatchEvent::created(&source));

    assert!(!source.exists());
    assert!(studio.artifact("goblin.png").exists());
}

#[test]
fn duplicate_notifications_print_once() {
    let mut studio = Studio::new(|_| {});
    let source = studio.drop_photo("elf.jpg", 800, 1100);

    studio.pipeline.handle_event(&WatchEvent::created(&source));
    let again = studio.pipeline.handle_event(&WatchEvent::modified(&source));

    assert!(matches!(again, Handled::Skipped(Skip::AlreadySeen)));
    assert_eq!(studio.device.submitted_names().len(), 1);
}

#[test]
fn text_files_are_ignored() {
    let mut studio = Studio::new(|_| {});
    let notes = studio.input("notes.txt");
    std::fs::write(&notes, "not a card").unwrap();

    let handled = studio.pipeline.handle_event(&WatchEvent::created(&notes));
    assert!(matches!(handled, Handled::Skipped(Skip::UnsupportedExtension)));
    assert!(studio.device.submitted_names().is_empty());
}

#[test]
fn corrupt_image_is_dropped_and_can_be_retried_after_fix() {
    let mut studio = Studio::new(|_| {});
    let source = studio.input("broken.jpg");
    std::fs::write(&source, b"definitely not a jpeg").unwrap();

    let handled = studio.pipeline.handle_event(&WatchEvent::created(&source));
    assert!(matches!(handled, Handled::Failed(ProcessError::Image(_))));
    assert!(!studio.pipeline.dedup().is_seen(&source));
    assert_eq!(studio.pipeline.errors().total(), 1);

    let img = RgbImage::from_pixel(750, 1050, Rgb([10, 120, 40]));
    img.save(&source).unwrap();
    let handled = studio.pipeline.handle_event(&WatchEvent::modified(&source));
    assert!(matches!(handled, Handled::Processed));
    assert_eq!(studio.device.submitted_names(), vec!["print_broken.jpg"]);
}

// =============================================================================
// Busy printer
// =============================================================================

#[test]
fn busy_printer_queues_then_sweep_prints_in_arrival_order() {
    let mut studio = Studio::new(|_| {});
    studio.device.script(&[PrinterState::Processing]);

    let first = studio.drop_photo("a.jpg", 1000, 1000);
    let second = studio.drop_photo("b.png", 600, 900);
    studio.pipeline.handle_event(&WatchEvent::created(&first));
    studio.pipeline.handle_event(&WatchEvent::created(&second));

    assert_eq!(studio.pipeline.queue().len(), 2);
    assert!(studio.device.submitted_names().is_empty());
    // Transformed even while waiting.
    assert!(studio.artifact("a.jpg").exists());

    studio.device.script(&[PrinterState::Idle]);
    assert_eq!(studio.pipeline.sweep_queue(), 2);

    assert!(studio.pipeline.queue().is_empty());
    assert_eq!(studio.device.submitted_names(), vec!["print_a.jpg", "print_b.png"]);
    assert_eq!(studio.pipeline.stats().printed, 2);
}

// =============================================================================
// Startup backlog
// =============================================================================

#[test]
fn backlog_is_printed_on_startup() {
    let mut studio = Studio::new(|_| {});
    studio.drop_photo("b.jpg", 900, 600);
    studio.drop_photo("a.png", 900, 600);
    std::fs::write(studio.input("readme.txt"), "ignore me").unwrap();

    assert_eq!(studio.pipeline.drain_backlog(), 2);
    assert_eq!(studio.device.submitted_names(), vec!["print_a.png", "print_b.jpg"]);

    let summary = studio.pipeline.shutdown(None);
    assert_eq!(summary.stats.printed, 2);
    assert!(summary.pending.is_empty());
    assert_eq!(summary.errors.total, 0);
}
