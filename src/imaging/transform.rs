//! Pure pixel operations on in-memory buffers.
//!
//! [`transform`] is the whole geometry transformer: flatten to RGB, map onto
//! the target canvas, optionally enhance. Nothing here touches the
//! filesystem; decoding and encoding live in the backend.

use super::calculations::{Geometry, plan_geometry};
use super::params::{Enhancement, TransformParams};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// Resampling filter for every resize.
const FILTER: FilterType = FilterType::Lanczos3;

/// Normalize any decoded image to opaque 3-channel RGB.
///
/// Inputs carrying alpha (RGBA, grey+alpha, palettes with transparency) are
/// composited onto white at the source's own size. Everything else is
/// converted without compositing.
pub fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    })
}

/// Composite one channel value with coverage `a` over white.
fn over_white(c: u8, a: u8) -> u8 {
    let (c, a) = (c as u32, a as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Map an RGB image onto exactly `target_width × target_height`.
pub fn fit_to_canvas(img: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    match plan_geometry(img.dimensions(), (target_width, target_height)) {
        Geometry::Stretch => imageops::resize(img, target_width, target_height, FILTER),
        Geometry::FillCrop {
            left,
            top,
            width,
            height,
        } => {
            let window = imageops::crop_imm(img, left, top, width, height).to_image();
            imageops::resize(&window, target_width, target_height, FILTER)
        }
    }
}

/// Stretch each channel so that, after ignoring `cutoff` percent of pixels
/// at both ends of its histogram, it spans the full 0–255 range.
///
/// Channels that are already flat after the cutoff are left unchanged.
pub fn autocontrast(img: &RgbImage, cutoff: f32) -> RgbImage {
    let mut histograms = [[0u64; 256]; 3];
    for pixel in img.pixels() {
        for (channel, value) in pixel.0.iter().enumerate() {
            histograms[channel][*value as usize] += 1;
        }
    }
    let total = img.width() as u64 * img.height() as u64;
    let luts: [[u8; 256]; 3] =
        std::array::from_fn(|channel| contrast_lut(&histograms[channel], total, cutoff));

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        for (channel, value) in pixel.0.iter_mut().enumerate() {
            *value = luts[channel][*value as usize];
        }
    }
    out
}

fn contrast_lut(histogram: &[u64; 256], total: u64, cutoff: f32) -> [u8; 256] {
    let identity: [u8; 256] = std::array::from_fn(|i| i as u8);
    let cut = (total as f64 * f64::from(cutoff) / 100.0) as u64;

    let mut seen = 0u64;
    let Some(low) = (0..256).find(|&i| {
        seen += histogram[i];
        seen > cut
    }) else {
        return identity;
    };

    seen = 0;
    let Some(high) = (0..256).rev().find(|&i| {
        seen += histogram[i];
        seen > cut
    }) else {
        return identity;
    };

    if high <= low {
        return identity;
    }

    let scale = 255.0 / (high - low) as f64;
    std::array::from_fn(|i| {
        let v = (i as f64 - low as f64) * scale;
        v.round().clamp(0.0, 255.0) as u8
    })
}

/// Blend the image against a smoothed copy of itself.
///
/// `factor > 1.0` sharpens, `1.0` is the identity. The smoothing kernel is
/// 3×3 with a center weight of 5 (sum 13); the outermost pixel ring is kept
/// from the original.
pub fn sharpen(img: &RgbImage, factor: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }
    let factor = f64::from(factor);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut sums = [0u32; 3];
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                    let p = img.get_pixel(x + dx - 1, y + dy - 1);
                    for c in 0..3 {
                        sums[c] += weight * p.0[c] as u32;
                    }
                }
            }
            let original = img.get_pixel(x, y);
            let target = out.get_pixel_mut(x, y);
            for c in 0..3 {
                let smooth = sums[c] as f64 / 13.0;
                let v = smooth + factor * (original.0[c] as f64 - smooth);
                target.0[c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Print optimization: contrast first, then sharpening.
pub fn enhance(img: &RgbImage, enhancement: &Enhancement) -> RgbImage {
    let contrasted = autocontrast(img, enhancement.contrast_cutoff);
    sharpen(&contrasted, enhancement.sharpness)
}

/// The full geometry transform.
///
/// Every non-empty input maps to an RGB canvas of exactly
/// `params.target_width × params.target_height`.
pub fn transform(img: &DynamicImage, params: &TransformParams) -> RgbImage {
    let rgb = flatten_to_rgb(img);
    let fitted = fit_to_canvas(&rgb, params.target_width, params.target_height);
    match &params.enhancement {
        Some(enhancement) => enhance(&fitted, enhancement),
        None => fitted,
    }
}
