//! Luminance to glyph mapping.

use super::charset::{Palette, PaletteOrder};

/// Map a normalized luminance to a palette index.
///
/// With [`PaletteOrder::LightestFirst`] the index is
/// `floor((1 - avg) * (len - 1))`; with [`PaletteOrder::DarkestFirst`] it is
/// `floor(avg * (len - 1))`. The result is always clamped to `[0, len - 1]`,
/// so out-of-range or NaN input cannot index past the ramp.
///
/// # Example
/// ```
/// use textreel::ascii::{glyph_index, PaletteOrder};
/// assert_eq!(glyph_index(1.0, 10, PaletteOrder::LightestFirst), 0);
/// assert_eq!(glyph_index(0.0, 10, PaletteOrder::LightestFirst), 9);
/// ```
pub fn glyph_index(avg: f32, len: usize, order: PaletteOrder) -> usize {
    if len <= 1 {
        return 0;
    }
    let avg = if avg.is_nan() { 0.0 } else { avg.clamp(0.0, 1.0) };
    let weight = match order {
        PaletteOrder::LightestFirst => 1.0 - avg,
        PaletteOrder::DarkestFirst => avg,
    };
    let max = (len - 1) as f32;
    ((weight * max).floor() as usize).min(len - 1)
}

impl Palette {
    /// Glyph for a normalized luminance in `[0, 1]`.
    #[inline]
    pub fn glyph_for(&self, avg: f32) -> char {
        self.glyphs()[glyph_index(avg, self.len(), self.order())]
    }
}

/// Map a row-major buffer of cell luminances into text rows.
///
/// Rows are joined with `\n`; there is no trailing newline.
pub fn map_to_rows(luminance: &[f32], width: usize, palette: &Palette) -> String {
    if width == 0 || luminance.is_empty() {
        return String::new();
    }
    let rows = luminance.len() / width;
    let mut out = String::with_capacity(luminance.len() * 2 + rows);
    for (i, row) in luminance.chunks_exact(width).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.extend(row.iter().map(|&avg| palette.glyph_for(avg)));
    }
    out
}
