//! Synthetic test card for checking the transformer and the printer.
//!
//! Layout on the default 750×1050 canvas (scaled for other sizes):
//!
//! ```text
//! ┌──────────────────────────────┐  3px frame, 20px inset
//! │ ┌──────────────────────────┐ │  title box  50,50 → 700,150
//! │ └──────────────────────────┘ │
//! │   ▯▯▯▯▯▯▯▯▯▯                 │  grey step wedge, black → white
//! │            ┼                 │  centre cross
//! │ ┌──────────────────────────┐ │  text box   50,850 → 700,1000
//! │ └──────────────────────────┘ │
//! └──────────────────────────────┘
//! ```

use crate::imaging::rust_backend::save_image;
use crate::imaging::{BackendError, EncodeParams, Quality};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Reference canvas the layout constants are expressed in.
const REF_WIDTH: u32 = 750;
const REF_HEIGHT: u32 = 1050;

pub const FRAME_INSET: u32 = 20;
const FRAME_THICKNESS: u32 = 3;
const BOX_THICKNESS: u32 = 2;
const WEDGE_STEPS: u32 = 10;

/// Scale a reference x coordinate to `width`.
fn sx(x: u32, width: u32) -> u32 {
    (x as u64 * width as u64 / REF_WIDTH as u64) as u32
}

fn sy(y: u32, height: u32) -> u32 {
    (y as u64 * height as u64 / REF_HEIGHT as u64) as u32
}

/// Draw a `thickness`-pixel outline between two corners (inclusive).
fn outline(img: &mut RgbImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32), thickness: u32) {
    for t in 0..thickness {
        let (left, top) = (x0 + t, y0 + t);
        let (right, bottom) = (x1.saturating_sub(t), y1.saturating_sub(t));
        if right <= left || bottom <= top {
            break;
        }
        let rect = Rect::at(left as i32, top as i32).of_size(right - left + 1, bottom - top + 1);
        draw_hollow_rect_mut(img, rect, BLACK);
    }
}

/// Render the test card at `width × height`.
pub fn render_test_card(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, WHITE);
    if width < 2 * FRAME_INSET || height < 2 * FRAME_INSET {
        return img;
    }

    outline(
        &mut img,
        (FRAME_INSET, FRAME_INSET),
        (width - 1 - FRAME_INSET, height - 1 - FRAME_INSET),
        FRAME_THICKNESS,
    );
    outline(
        &mut img,
        (sx(50, width), sy(50, height)),
        (sx(700, width), sy(150, height)),
        BOX_THICKNESS,
    );
    outline(
        &mut img,
        (sx(50, width), sy(850, height)),
        (sx(700, width), sy(1000, height)),
        BOX_THICKNESS,
    );

    // Step wedge
    let wedge_top = sy(250, height);
    let wedge_height = sy(80, height).max(1);
    let step_width = (sx(650, width) / WEDGE_STEPS).max(1);
    for step in 0..WEDGE_STEPS {
        let level = (step * 255 / (WEDGE_STEPS - 1)) as u8;
        let rect = Rect::at((sx(50, width) + step * step_width) as i32, wedge_top as i32)
            .of_size(step_width, wedge_height);
        draw_filled_rect_mut(&mut img, rect, Rgb([level, level, level]));
    }

    // Centre cross
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let arm = sx(60, width) as f32;
    draw_line_segment_mut(&mut img, (cx - arm, cy), (cx + arm, cy), BLACK);
    draw_line_segment_mut(&mut img, (cx, cy - arm), (cx, cy + arm), BLACK);

    img
}

/// Render and save a test card; the format follows `path`'s extension.
pub fn write_test_card(path: &Path, width: u32, height: u32, dpi: u32) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let card = render_test_card(width, height);
    save_image(
        &card,
        path,
        &EncodeParams {
            dpi,
            quality: Quality::default(),
        },
    )?;
    tracing::info!(file = %path.display(), "created test card");
    Ok(())
}
