//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides where artifacts go) and the [`backend`](super::backend)
//! (which does the pixel work), so a mock backend can stand in for tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1 to 100, default 95). Clamped on construction.
//! - [`Enhancement`]: Auto-contrast cutoff and sharpness factor for print optimization.
//! - [`TransformParams`]: Target canvas plus optional enhancement.
//! - [`EncodeParams`]: Resolution tag and quality for the written file.
//! - [`PrepareParams`]: Everything one prepare call needs (source, output, transform, encode).

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Print optimization applied after the geometry transform.
///
/// - `contrast_cutoff`: percent of darkest and lightest pixels ignored when
///   stretching each channel's range
/// - `sharpness`: blend factor against a smoothed copy (1.0 = unchanged)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enhancement {
    pub contrast_cutoff: f32,
    pub sharpness: f32,
}

impl Enhancement {
    /// Mild settings suited to card stock: 0.5% tail clip, 1.2× sharpness.
    pub fn card_stock() -> Self {
        Self {
            contrast_cutoff: 0.5,
            sharpness: 1.2,
        }
    }
}

/// Target canvas for the geometry transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub target_width: u32,
    pub target_height: u32,
    pub enhancement: Option<Enhancement>,
}

/// How the transformed canvas is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub dpi: u32,
    /// Only used by lossy formats.
    pub quality: Quality,
}

/// Parameters for a full prepare-for-print operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub transform: TransformParams,
    pub encode: EncodeParams,
}
