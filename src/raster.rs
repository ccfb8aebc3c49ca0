//! Frame rasterizer: one RGBA source frame in, one glyph grid out.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::ascii::{
    downsample, grid_dimensions, map_to_rows, prescale, Palette, ToneAdjust,
};

/// One rendered text-art frame.
///
/// Cheap to clone: the text is shared. Rows are separated by `\n` with no
/// trailing newline; every row holds exactly `width` glyphs.
#[derive(Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    text: Arc<str>,
    width: u32,
    height: u32,
}

impl GlyphGrid {
    /// The grid returned for unreadable sources.
    pub fn empty() -> Self {
        Self {
            text: Arc::from(""),
            width: 0,
            height: 0,
        }
    }

    /// Build a grid from already-joined rows.
    pub(crate) fn from_text(text: String, width: u32, height: u32) -> Self {
        Self {
            text: Arc::from(text),
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Columns per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        let take = if self.is_empty() { 0 } else { self.height as usize };
        self.text.split('\n').take(take)
    }

    /// The whole grid as one text block.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Default for GlyphGrid {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for GlyphGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl fmt::Display for GlyphGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Everything the rasterizer reads from the configuration, captured once
/// per pipeline run so every frame of a cache uses the same values.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSettings {
    pub grid_width: u32,
    pub tone: ToneAdjust,
    pub palette: Palette,
    pub aspect_correction: f32,
}

/// Errors raised by [`try_rasterize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("source frame has no readable pixels ({width}x{height})")]
    EmptySource { width: u32, height: u32 },
}

/// Rasterize one frame, reporting unreadable sources as an error.
pub fn try_rasterize(source: &RgbaImage, settings: &RasterSettings) -> Result<GlyphGrid, RasterError> {
    let (img_w, img_h) = source.dimensions();
    let (cols, rows) = grid_dimensions(settings.grid_width, img_w, img_h, settings.aspect_correction);
    if cols == 0 || rows == 0 {
        return Err(RasterError::EmptySource {
            width: img_w,
            height: img_h,
        });
    }

    // Tone runs at full resolution so clamping sees the real pixel values.
    let mut work = source.clone();
    settings.tone.apply_levels(&mut work);

    if let Some(smaller) = prescale(&work, cols, rows) {
        work = smaller;
    }

    let pixels_per_cell = work.width() as f32 / cols as f32;
    if let Some(blurred) = settings.tone.apply_blur(&work, pixels_per_cell) {
        work = blurred;
    }

    let cells = downsample(&work, cols, rows);
    let text = map_to_rows(&cells, cols as usize, &settings.palette);
    Ok(GlyphGrid::from_text(text, cols, rows))
}

/// Rasterize one frame. Unreadable sources yield [`GlyphGrid::empty`],
/// which callers treat as "skip this frame".
pub fn rasterize(source: &RgbaImage, settings: &RasterSettings) -> GlyphGrid {
    match try_rasterize(source, settings) {
        Ok(grid) => grid,
        Err(e) => {
            log::warn!("Emitting empty grid: {}", e);
            GlyphGrid::empty()
        }
    }
}
