//! Unit tests for the frame rasterizer and its building blocks.
//!
//! These tests cover:
//! - Grid dimensions and row shape
//! - Determinism
//! - Luminance monotonicity under both palette orders
//! - Tone adjustments
//! - Empty sources

use image::{Rgba, RgbaImage};
use textreel::ascii::*;
use textreel::raster::{rasterize, try_rasterize, RasterError, RasterSettings};

fn settings(grid_width: u32, charset: CharSet, order: PaletteOrder) -> RasterSettings {
    RasterSettings {
        grid_width,
        tone: ToneAdjust::default(),
        palette: charset.palette(order),
        aspect_correction: DEFAULT_ASPECT_CORRECTION,
    }
}

fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
}

fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        let v = ((x * 7 + y * 13) % 256) as u8;
        Rgba([v, v.wrapping_mul(3), 255 - v, 255])
    })
}

// ==================== Dimension Tests ====================

#[test]
fn test_white_square_two_by_two() {
    let mut s = settings(2, CharSet::Standard, PaletteOrder::LightestFirst);
    s.aspect_correction = 1.0;
    let grid = rasterize(&solid(4, 4, 255), &s);
    assert_eq!((grid.width(), grid.height()), (2, 2));
    let lightest = s.palette.lightest();
    assert_eq!(grid.as_str(), format!("{0}{0}\n{0}{0}", lightest));
}

#[test]
fn test_default_correction_halves_rows() {
    let grid = rasterize(&solid(4, 4, 255), &settings(2, CharSet::Standard, PaletteOrder::LightestFirst));
    assert_eq!((grid.width(), grid.height()), (2, 1));
}

#[test]
fn test_every_row_has_grid_width_glyphs() {
    for width in [1u32, 3, 17, 80, 200] {
        let grid = rasterize(&gradient(320, 240), &settings(width, CharSet::Dense, PaletteOrder::LightestFirst));
        let expected_rows = grid_height(width, 320, 240, DEFAULT_ASPECT_CORRECTION);
        assert_eq!(grid.height(), expected_rows, "width {}", width);
        assert_eq!(grid.rows().count() as u32, expected_rows);
        for row in grid.rows() {
            assert_eq!(row.chars().count() as u32, width);
        }
    }
}

#[test]
fn test_tight_correction_packs_fewer_rows() {
    let mut s = settings(100, CharSet::Standard, PaletteOrder::LightestFirst);
    let normal = rasterize(&gradient(400, 400), &s);
    s.aspect_correction = TIGHT_ASPECT_CORRECTION;
    let tight = rasterize(&gradient(400, 400), &s);
    assert_eq!(normal.height(), 50);
    assert_eq!(tight.height(), 45);
}

#[test]
fn test_one_column_of_wide_image_still_has_a_row() {
    let grid = rasterize(&solid(100, 10, 0), &settings(1, CharSet::Blocks, PaletteOrder::LightestFirst));
    assert_eq!((grid.width(), grid.height()), (1, 1));
}

// ==================== Determinism Tests ====================

#[test]
fn test_same_input_same_grid() {
    let img = gradient(123, 77);
    let mut s = settings(40, CharSet::Cyberpunk, PaletteOrder::LightestFirst);
    s.tone = ToneAdjust {
        brightness: 1.3,
        contrast: 2.0,
        blur: 0.7,
    };
    let a = rasterize(&img, &s);
    let b = rasterize(&img, &s);
    assert_eq!(a, b);
}

#[test]
fn test_every_glyph_comes_from_palette() {
    for charset in CharSet::ALL {
        let s = settings(30, charset, PaletteOrder::LightestFirst);
        let grid = rasterize(&gradient(90, 60), &s);
        for c in grid.as_str().chars().filter(|c| *c != '\n') {
            assert!(s.palette.glyphs().contains(&c), "{:?} not in {}", c, charset);
        }
    }
}

// ==================== Monotonicity Tests ====================

fn glyph_position(palette: &Palette, c: char) -> usize {
    palette.glyphs().iter().position(|g| *g == c).unwrap()
}

#[test]
fn test_brighter_maps_to_lower_index_lightest_first() {
    let s = settings(1, CharSet::Dense, PaletteOrder::LightestFirst);
    let mut previous = usize::MAX;
    for v in (0..=255u16).step_by(5) {
        let grid = rasterize(&solid(2, 2, v as u8), &s);
        let idx = glyph_position(&s.palette, grid.as_str().chars().next().unwrap());
        assert!(idx <= previous, "luminance {} moved to index {}", v, idx);
        previous = idx;
    }
}

#[test]
fn test_brighter_maps_to_higher_index_darkest_first() {
    let s = settings(1, CharSet::Simple, PaletteOrder::DarkestFirst);
    let mut previous = 0;
    for v in (0..=255u16).step_by(5) {
        let grid = rasterize(&solid(2, 2, v as u8), &s);
        let idx = glyph_position(&s.palette, grid.as_str().chars().next().unwrap());
        assert!(idx >= previous, "luminance {} moved to index {}", v, idx);
        previous = idx;
    }
}

#[test]
fn test_extremes_hit_palette_ends() {
    for order in [PaletteOrder::LightestFirst, PaletteOrder::DarkestFirst] {
        let s = settings(1, CharSet::Blocks, order);
        let white = rasterize(&solid(2, 2, 255), &s);
        let black = rasterize(&solid(2, 2, 0), &s);
        assert_eq!(white.as_str().chars().next(), Some(s.palette.lightest()));
        assert_eq!(black.as_str().chars().next(), Some(s.palette.darkest()));
    }
}

// ==================== Tone Tests ====================

#[test]
fn test_contrast_pushes_midtones_apart() {
    let mut s = settings(1, CharSet::Blocks, PaletteOrder::LightestFirst);
    s.tone.contrast = 3.0;
    let light = rasterize(&solid(2, 2, 192), &s);
    let dark = rasterize(&solid(2, 2, 64), &s);
    assert_eq!(light.as_str(), "█");
    assert_eq!(dark.as_str(), " ");
}

#[test]
fn test_blur_softens_hard_edge() {
    let img = RgbaImage::from_fn(80, 8, |x, _| {
        if x < 40 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let mut s = settings(10, CharSet::Dense, PaletteOrder::LightestFirst);
    s.aspect_correction = 1.0;
    let sharp = rasterize(&img, &s);
    s.tone.blur = 1.5;
    let soft = rasterize(&img, &s);
    let edge = |g: &textreel::GlyphGrid| g.rows().next().unwrap().chars().nth(3).unwrap();
    assert_eq!(edge(&sharp), s.palette.darkest());
    assert_ne!(edge(&soft), s.palette.darkest());
}

// ==================== Empty Source Tests ====================

#[test]
fn test_empty_source_reports_error() {
    let s = settings(10, CharSet::Standard, PaletteOrder::LightestFirst);
    assert_eq!(
        try_rasterize(&RgbaImage::new(0, 0), &s),
        Err(RasterError::EmptySource {
            width: 0,
            height: 0
        })
    );
    assert!(rasterize(&RgbaImage::new(0, 0), &s).is_empty());
}
