//! Geometry transformer in pure Rust, no system image libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode** (JPEG, PNG, BMP, TIFF) | `image::ImageReader` with guessed format |
//! | **Flatten alpha** | composite onto opaque white ([`transform::flatten_to_rgb`]) |
//! | **Fill + crop** | `imageops::crop_imm` in source pixels, then Lanczos3 `imageops::resize` |
//! | **Print optimization** | auto-contrast then sharpness blend ([`transform::enhance`]) |
//! | **Encode** | JPEG with JFIF density, PNG with `pHYs`, others via `image` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for the stretch-or-fill decision (unit testable)
//! - **Parameters**: Data structures describing a transform
//! - **Transform**: Pure pixel operations on in-memory buffers
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining naming, parameters, and backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{ASPECT_TOLERANCE, Geometry, plan_geometry};
pub use operations::{BatchReport, PrintGeometry, batch_process, prepare_for_print};
pub use params::{EncodeParams, Enhancement, PrepareParams, Quality, TransformParams};
pub use rust_backend::RustBackend;
