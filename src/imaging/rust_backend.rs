//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, BMP, TIFF) | `image::ImageReader` (format sniffed from content) |
//! | Transform | [`transform::transform`](super::transform::transform) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with JFIF pixel density |
//! | Encode → PNG | `png::Encoder` with a `pHYs` chunk |
//! | Encode → TIFF | `tiff::encoder::TiffEncoder` with `XResolution`/`YResolution` in inches |
//! | Encode → BMP | `image::codecs::bmp::BmpEncoder`, pixels-per-metre header patched in |
//! | Encode → other | `image::ImageBuffer::save_with_format` (no resolution tag) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, PrepareParams};
use super::transform;
use crate::naming::extension_of;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{Rational, TiffEncoder, colortype};
use tiff::tags::ResolutionUnit;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn unreadable(path: &Path, reason: impl ToString) -> BackendError {
    BackendError::UnreadableImage {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn encode_failed(path: &Path, reason: impl ToString) -> BackendError {
    BackendError::EncodeFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Load and decode an image from disk.
///
/// A missing file is an I/O error; anything that opens but does not decode
/// to a non-empty raster is unreadable.
pub fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| unreadable(path, e))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(unreadable(path, "image has no pixels"));
    }
    Ok(img)
}

/// Save an RGB canvas, choosing the encoder from the output extension.
pub fn save_image(img: &RgbImage, path: &Path, encode: &EncodeParams) -> Result<(), BackendError> {
    let ext = extension_of(path).unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => save_jpeg(img, path, encode),
        "png" => save_png(img, path, encode.dpi),
        "tif" | "tiff" => save_tiff(img, path, encode.dpi),
        "bmp" => save_bmp(img, path, encode.dpi),
        other => {
            let format = ImageFormat::from_extension(other)
                .ok_or_else(|| encode_failed(path, format!("unsupported output format: {other:?}")))?;
            img.save_with_format(path, format)
                .map_err(|e| encode_failed(path, e))
        }
    }
}

fn save_jpeg(img: &RgbImage, path: &Path, encode: &EncodeParams) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, encode.quality.value() as u8);
    encoder.set_pixel_density(PixelDensity::dpi(encode.dpi.min(u16::MAX as u32) as u16));
    encoder
        .encode_image(img)
        .map_err(|e| encode_failed(path, e))
}

/// Pixels per metre for a DPI value, as stored in PNG `pHYs`.
fn dots_per_metre(dpi: u32) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}

fn save_png(img: &RgbImage, path: &Path, dpi: u32) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(writer, img.width(), img.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let ppm = dots_per_metre(dpi);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));
    let mut png_writer = encoder
        .write_header()
        .map_err(|e| encode_failed(path, e))?;
    png_writer
        .write_image_data(img.as_raw())
        .map_err(|e| encode_failed(path, e))?;
    png_writer.finish().map_err(|e| encode_failed(path, e))
}

fn save_tiff(img: &RgbImage, path: &Path, dpi: u32) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(writer).map_err(|e| encode_failed(path, e))?;
    let mut image = encoder
        .new_image::<colortype::RGB8>(img.width(), img.height())
        .map_err(|e| encode_failed(path, e))?;
    image.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
    image
        .write_data(img.as_raw())
        .map_err(|e| encode_failed(path, e))
}

/// Byte offset of `biXPelsPerMeter` (file header plus 24 bytes into the
/// info header); `biYPelsPerMeter` follows it.
const BMP_X_PPM_OFFSET: usize = 38;
const BMP_INFO_HEADER_LEN: u32 = 40;

fn save_bmp(img: &RgbImage, path: &Path, dpi: u32) -> Result<(), BackendError> {
    let mut bytes = Vec::new();
    BmpEncoder::new(&mut bytes)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(|e| encode_failed(path, e))?;

    let header_len = bytes
        .get(14..18)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .unwrap_or(0);
    if header_len < BMP_INFO_HEADER_LEN || bytes.len() < BMP_X_PPM_OFFSET + 8 {
        return Err(encode_failed(path, "unexpected BMP header layout"));
    }
    let ppm = (dots_per_metre(dpi) as i32).to_le_bytes();
    bytes[BMP_X_PPM_OFFSET..BMP_X_PPM_OFFSET + 4].copy_from_slice(&ppm);
    bytes[BMP_X_PPM_OFFSET + 4..BMP_X_PPM_OFFSET + 8].copy_from_slice(&ppm);

    std::fs::write(path, bytes)?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| unreadable(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn prepare(&self, params: &PrepareParams) -> Result<Dimensions, BackendError> {
        let img = load_image(&params.source)?;
        let canvas = transform::transform(&img, &params.transform);
        save_image(&canvas, &params.output, &params.encode)?;
        Ok(Dimensions {
            width: canvas.width(),
            height: canvas.height(),
        })
    }
}
