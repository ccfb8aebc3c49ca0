//! Text-art building blocks: palettes, luminance sampling and grid math.
//!
//! A frame becomes text in four steps:
//!
//! 1. **Tone** - brightness and contrast, then an optional Gaussian blur
//! 2. **Downsampling** - average each grid cell's pixels
//! 3. **Luminance** - mean of R, G and B, normalized to `[0, 1]`
//! 4. **Mapping** - pick a glyph from a [`Palette`] by luminance
//!
//! # Character Sets
//!
//! Named ramps live in [`CharSet`]: `galaxy`, `matrix`, `full`, `dense`,
//! `blocks`, `standard`, `cyberpunk` and `simple`.

mod charset;
mod dimensions;
mod downsample;
mod grayscale;
mod mapping;
mod tone;

pub use charset::{
    CharSet, Palette, PaletteOrder, UnknownCharSet, BLOCKS_CHARSET, CYBERPUNK_CHARSET,
    DENSE_CHARSET, FULL_CHARSET, GALAXY_CHARSET, MATRIX_CHARSET, SIMPLE_CHARSET,
    STANDARD_CHARSET,
};
pub use dimensions::{
    grid_dimensions, grid_height, DEFAULT_ASPECT_CORRECTION, TIGHT_ASPECT_CORRECTION,
};
pub use downsample::{downsample, prescale, SUBSAMPLES_PER_CELL};
pub use grayscale::{cell_luminance, rgba_luminance};
pub use mapping::{glyph_index, map_to_rows};
pub use tone::ToneAdjust;
