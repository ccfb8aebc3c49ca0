//! Brightness, contrast and blur adjustments applied before sampling.

use image::{imageops, RgbaImage};

/// Tone settings in CSS filter units.
///
/// `brightness` and `contrast` are multipliers (1.0 = unchanged); `blur` is
/// a Gaussian standard deviation measured in output grid cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneAdjust {
    pub brightness: f32,
    pub contrast: f32,
    pub blur: f32,
}

impl Default for ToneAdjust {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            blur: 0.0,
        }
    }
}

impl ToneAdjust {
    /// True when the brightness/contrast pass would change nothing.
    pub fn is_identity(&self) -> bool {
        (self.brightness - 1.0).abs() < f32::EPSILON && (self.contrast - 1.0).abs() < f32::EPSILON
    }

    /// Apply brightness then contrast to every colour channel in place.
    ///
    /// `v' = clamp((clamp(v * brightness) - 0.5) * contrast + 0.5)`, with `v`
    /// in `[0, 1]`. Alpha is left untouched.
    pub fn apply_levels(&self, image: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }
        let lut = self.level_table();
        for px in image.pixels_mut() {
            px.0[0] = lut[px.0[0] as usize];
            px.0[1] = lut[px.0[1] as usize];
            px.0[2] = lut[px.0[2] as usize];
        }
    }

    /// Gaussian blur with sigma scaled from grid cells to image pixels.
    ///
    /// `pixels_per_cell` is the horizontal number of image pixels covered by
    /// one output column.
    pub fn apply_blur(&self, image: &RgbaImage, pixels_per_cell: f32) -> Option<RgbaImage> {
        if !(self.blur > 0.0) || !(pixels_per_cell > 0.0) {
            return None;
        }
        Some(imageops::blur(image, self.blur * pixels_per_cell))
    }

    fn level_table(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let v = i as f32 / 255.0;
            // each filter stage clamps, as CSS component transfers do
            let v = (v * self.brightness).clamp(0.0, 1.0);
            let v = (v - 0.5) * self.contrast + 0.5;
            *slot = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        lut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn grey(v: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([v, v, v, 255]))
    }

    #[test]
    fn test_identity_leaves_pixels() {
        let mut img = grey(77);
        ToneAdjust::default().apply_levels(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [77, 77, 77, 255]);
    }

    #[test]
    fn test_brightness_scales() {
        let mut img = grey(100);
        let tone = ToneAdjust {
            brightness: 2.0,
            ..ToneAdjust::default()
        };
        tone.apply_levels(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn test_brightness_zero_is_black() {
        let mut img = grey(255);
        let tone = ToneAdjust {
            brightness: 0.0,
            ..ToneAdjust::default()
        };
        tone.apply_levels(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_contrast_pushes_away_from_mid() {
        let mut dark = grey(64);
        let mut light = grey(192);
        let tone = ToneAdjust {
            contrast: 3.0,
            ..ToneAdjust::default()
        };
        tone.apply_levels(&mut dark);
        tone.apply_levels(&mut light);
        assert_eq!(dark.get_pixel(0, 0).0[0], 0);
        assert_eq!(light.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_contrast_zero_is_flat_grey() {
        let mut img = grey(10);
        let tone = ToneAdjust {
            contrast: 0.0,
            ..ToneAdjust::default()
        };
        tone.apply_levels(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[0], 128);
    }

    #[test]
    fn test_brightness_clamps_before_contrast() {
        // 200/255 * 2 saturates to 1.0, then (1.0 - 0.5) * 0.5 + 0.5 = 0.75
        let mut img = grey(200);
        let tone = ToneAdjust {
            brightness: 2.0,
            contrast: 0.5,
            blur: 0.0,
        };
        tone.apply_levels(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[0], 191);
    }

    #[test]
    fn test_alpha_untouched() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([10, 10, 10, 7]));
        let tone = ToneAdjust {
            brightness: 3.0,
            ..ToneAdjust::default()
        };
        tone.apply_levels(&mut img);
        assert_eq!(img.get_pixel(0, 0).0[3], 7);
    }

    #[test]
    fn test_blur_disabled_returns_none() {
        let img = grey(50);
        assert!(ToneAdjust::default().apply_blur(&img, 4.0).is_none());
    }

    #[test]
    fn test_blur_spreads_a_bright_pixel() {
        let mut img = RgbaImage::from_pixel(9, 9, Rgba([0, 0, 0, 255]));
        img.put_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let tone = ToneAdjust {
            blur: 1.0,
            ..ToneAdjust::default()
        };
        let blurred = tone.apply_blur(&img, 1.0).unwrap();
        assert!(blurred.get_pixel(4, 4).0[0] < 255);
        assert!(blurred.get_pixel(5, 4).0[0] > 0);
    }
}
