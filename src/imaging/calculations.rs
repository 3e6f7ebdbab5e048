//! Pure calculation functions for print geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Sources whose aspect ratio is within this distance of the target's are
/// stretched to the canvas instead of cropped.
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// How a source image is mapped onto the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Resize directly to the target dimensions (no crop).
    Stretch,
    /// Take the `width × height` window at `(left, top)` of the source,
    /// then resize that window to the target. The window has the target's
    /// aspect ratio, so the resize covers the canvas without letterboxing.
    FillCrop {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },
}

/// Decide how to map `source` onto `target`, both given as (width, height).
///
/// Near-matching aspect ratios stretch; everything else fills and
/// center-crops. The crop window is expressed in source pixels, so no
/// intermediate larger than the source is ever needed. Offsets use floor
/// division so the result is deterministic for odd overflows.
///
/// # Examples
/// ```
/// # use tcg_printer::imaging::{plan_geometry, Geometry};
/// // Wide landscape onto a portrait card: keep the full height, crop the sides
/// assert_eq!(
///     plan_geometry((2000, 300), (750, 1050)),
///     Geometry::FillCrop { left: 893, top: 0, width: 214, height: 300 }
/// );
///
/// // 3:4 onto 5:7 is close enough to stretch
/// assert_eq!(plan_geometry((300, 400), (750, 1050)), Geometry::Stretch);
/// ```
pub fn plan_geometry(source: (u32, u32), target: (u32, u32)) -> Geometry {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    if src_w == 0 || src_h == 0 || tgt_w == 0 || tgt_h == 0 {
        return Geometry::Stretch;
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if (src_aspect - tgt_aspect).abs() < ASPECT_TOLERANCE {
        return Geometry::Stretch;
    }

    let (width, height) = calculate_crop_window(source, target);
    Geometry::FillCrop {
        left: (src_w - width) / 2,
        top: (src_h - height) / 2,
        width,
        height,
    }
}

/// Size of the source window that, scaled by the fill factor, becomes the
/// target canvas.
///
/// With `scale = max(tgt_w / src_w, tgt_h / src_h)` the window is
/// `target / scale`, rounded and clamped to `1..=source` on each axis. One
/// axis always spans the whole source.
pub fn calculate_crop_window(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = f64::max(tgt_w as f64 / src_w as f64, tgt_h as f64 / src_h as f64);

    let w = ((tgt_w as f64 / scale).round() as u32).clamp(1, src_w);
    let h = ((tgt_h as f64 / scale).round() as u32).clamp(1, src_h);
    (w, h)
}
