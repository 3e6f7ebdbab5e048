//! High-level image operations.
//!
//! These functions combine naming and calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{EncodeParams, Enhancement, PrepareParams, Quality, TransformParams};
use crate::config::ImageConfig;
use crate::naming::processed_path;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Output geometry and encoding settings shared by every prepared card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintGeometry {
    pub target_width: u32,
    pub target_height: u32,
    pub dpi: u32,
    pub quality: Quality,
    pub optimize: bool,
}

impl PrintGeometry {
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            target_width: config.target_width,
            target_height: config.target_height,
            dpi: config.dpi,
            quality: Quality::new(config.jpeg_quality),
            optimize: config.optimize_for_print,
        }
    }
}

impl Default for PrintGeometry {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}

/// Plan a prepare operation without executing it.
///
/// Returns `None` when the source has no file name to derive an output from.
pub fn plan_prepare(source: &Path, output_dir: &Path, geometry: &PrintGeometry) -> Option<PrepareParams> {
    let output = processed_path(output_dir, source)?;
    Some(PrepareParams {
        source: source.to_path_buf(),
        output,
        transform: TransformParams {
            target_width: geometry.target_width,
            target_height: geometry.target_height,
            enhancement: geometry.optimize.then(Enhancement::card_stock),
        },
        encode: EncodeParams {
            dpi: geometry.dpi,
            quality: geometry.quality,
        },
    })
}

/// Produce the print-ready artifact for `source` inside `output_dir`.
///
/// The directory is created if missing. The artifact is named
/// `print_<original name>` and keeps the source's extension, so it is
/// encoded in the source's format.
pub fn prepare_for_print(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    geometry: &PrintGeometry,
) -> Result<PathBuf> {
    let params = plan_prepare(source, output_dir, geometry)
        .ok_or_else(|| BackendError::InvalidOutputPath(source.to_path_buf()))?;
    std::fs::create_dir_all(output_dir)?;
    backend.prepare(&params)?;
    Ok(params.output)
}

/// Outcome of a batch run: artifacts written and sources that failed.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, BackendError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// Prepare many files in parallel on the global rayon pool.
///
/// One failure never stops the rest. Results come back in input order.
pub fn batch_process(
    backend: &impl ImageBackend,
    files: &[PathBuf],
    output_dir: &Path,
    geometry: &PrintGeometry,
) -> BatchReport {
    let results: Vec<(PathBuf, Result<PathBuf>)> = files
        .par_iter()
        .map(|file| (file.clone(), prepare_for_print(backend, file, output_dir, geometry)))
        .collect();

    let mut report = BatchReport::default();
    for (file, result) in results {
        match result {
            Ok(output) => report.processed.push(output),
            Err(e) => report.failed.push((file, e)),
        }
    }
    report
}
