//! Downsampling RGBA images to character grid cells.

use image::{imageops, RgbaImage};

use super::grayscale::cell_luminance;

/// Sub-samples kept per cell edge when pre-scaling a large source.
pub const SUBSAMPLES_PER_CELL: u32 = 4;

/// Shrink a source that is much larger than the grid.
///
/// Returns `None` when the source is already at most
/// [`SUBSAMPLES_PER_CELL`] pixels per cell in both directions. The result
/// keeps enough resolution for cell averaging while bounding the cost of
/// blur and sampling on large video frames.
pub fn prescale(image: &RgbaImage, char_width: u32, char_height: u32) -> Option<RgbaImage> {
    if char_width == 0 || char_height == 0 {
        return None;
    }
    let target_w = char_width.saturating_mul(SUBSAMPLES_PER_CELL);
    let target_h = char_height.saturating_mul(SUBSAMPLES_PER_CELL);
    if image.width() <= target_w && image.height() <= target_h {
        return None;
    }
    let w = image.width().min(target_w);
    let h = image.height().min(target_h);
    Some(imageops::resize(image, w, h, imageops::FilterType::Triangle))
}

/// Average luminance of every cell of a `char_width x char_height` grid.
///
/// Each cell covers a proportional rectangle of the source; when the source
/// is smaller than the grid a cell still reads at least one pixel (nearest
/// neighbour). Output is row-major, `char_width * char_height` long, and
/// empty for any zero dimension.
pub fn downsample(image: &RgbaImage, char_width: u32, char_height: u32) -> Vec<f32> {
    let (img_w, img_h) = image.dimensions();
    if char_width == 0 || char_height == 0 || img_w == 0 || img_h == 0 {
        return Vec::new();
    }

    let cell_w = img_w as f64 / char_width as f64;
    let cell_h = img_h as f64 / char_height as f64;
    let mut out = Vec::with_capacity(char_width as usize * char_height as usize);

    for cy in 0..char_height {
        let (y0, y1) = span(cy, cell_h, img_h);
        for cx in 0..char_width {
            let (x0, x1) = span(cx, cell_w, img_w);
            out.push(cell_luminance(image, x0, y0, x1, y1));
        }
    }
    out
}

/// Pixel range `[start, end)` covered by cell `i`, never empty.
fn span(i: u32, cell: f64, limit: u32) -> (u32, u32) {
    let start = ((i as f64 * cell) as u32).min(limit - 1);
    let end = (((i + 1) as f64 * cell) as u32).clamp(start + 1, limit);
    (start, end)
}
