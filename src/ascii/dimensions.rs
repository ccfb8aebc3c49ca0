//! Grid dimension math for aspect-correct text art.

/// Glyph cells are roughly twice as tall as they are wide, so half as many
/// rows as the source aspect ratio suggests keeps proportions.
pub const DEFAULT_ASPECT_CORRECTION: f32 = 0.5;

/// A tighter vertical pack for fonts with short line height.
pub const TIGHT_ASPECT_CORRECTION: f32 = 0.45;

/// Number of glyph rows for a given column count.
///
/// Computes `floor(grid_width * (img_height / img_width) * correction)`.
/// Returns 0 for a zero-sized source, a zero width or a non-positive
/// correction. A non-empty source always gets at least one row, so a
/// degenerate floor (e.g. one column over a square image) still yields a
/// 1-row grid.
///
/// # Example
/// ```
/// use textreel::ascii::grid_height;
/// // 640x480 at 80 columns: floor(80 * 0.75 * 0.5) = 30 rows
/// assert_eq!(grid_height(80, 640, 480, 0.5), 30);
/// ```
pub fn grid_height(grid_width: u32, img_width: u32, img_height: u32, correction: f32) -> u32 {
    if grid_width == 0 || img_width == 0 || img_height == 0 || !(correction > 0.0) {
        return 0;
    }
    let aspect = img_height as f64 / img_width as f64;
    let rows = grid_width as f64 * aspect * widen(correction);
    // relative slack keeps exact products from landing just under an integer
    let rows = (rows + rows * 1e-9).floor();
    (rows as u32).max(1)
}

/// Widen through the shortest decimal form, so `0.45f32` becomes `0.45`
/// rather than `0.44999998...`.
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(value as f64)
}

/// Grid `(columns, rows)` for a source of the given natural size.
pub fn grid_dimensions(
    grid_width: u32,
    img_width: u32,
    img_height: u32,
    correction: f32,
) -> (u32, u32) {
    let rows = grid_height(grid_width, img_width, img_height, correction);
    if rows == 0 {
        (0, 0)
    } else {
        (grid_width, rows)
    }
}
