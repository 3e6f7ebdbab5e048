//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs:
//! identify and prepare (decode → transform → encode). The production
//! implementation is [`RustBackend`](super::rust_backend::RustBackend).

use super::params::PrepareParams;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unreadable image {}: {reason}", path.display())]
    UnreadableImage { path: PathBuf, reason: String },
    #[error("Encoding failed for {}: {reason}", path.display())]
    EncodeFailed { path: PathBuf, reason: String },
    #[error("No output name can be derived from {}", .0.display())]
    InvalidOutputPath(PathBuf),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so batch processing can share one backend across rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions without a full decode.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, run the geometry transform, and write the output.
    /// Returns the dimensions of the written image.
    fn prepare(&self, params: &PrepareParams) -> Result<Dimensions, BackendError>;
}
