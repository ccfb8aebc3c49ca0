//! Per-cell luminance sampling over RGBA buffers.

use image::RgbaImage;

/// Average luminance of a rectangular region, normalized to `[0, 1]`.
///
/// Luminance is the plain mean of R, G and B; alpha is ignored, so callers
/// must flatten transparent sources onto an opaque background first.
/// The region is clipped to the image; an empty intersection yields 0.0.
pub fn cell_luminance(image: &RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) -> f32 {
    let x1 = x1.min(image.width());
    let y1 = y1.min(image.height());
    if x0 >= x1 || y0 >= y1 {
        return 0.0;
    }

    let stride = image.width() as usize * 4;
    let raw = image.as_raw();
    let mut sum = 0u64;
    for y in y0..y1 {
        let row = &raw[y as usize * stride..(y as usize + 1) * stride];
        for px in row[x0 as usize * 4..x1 as usize * 4].chunks_exact(4) {
            sum += px[0] as u64 + px[1] as u64 + px[2] as u64;
        }
    }

    let count = ((x1 - x0) as u64) * ((y1 - y0) as u64);
    sum as f32 / (count as f32 * 3.0 * 255.0)
}

/// Luminance of a raw RGBA pixel slice (4 bytes per pixel).
pub fn rgba_luminance(pixels: &[u8]) -> f32 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for px in pixels.chunks_exact(4) {
        sum += px[0] as u64 + px[1] as u64 + px[2] as u64;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    sum as f32 / (count as f32 * 3.0 * 255.0)
}
