//! Still image adapter.

use image::RgbaImage;

use super::types::{MediaError, StillRaster};

/// Decode any supported still format into an opaque raster.
pub fn decode_still(bytes: &[u8]) -> Result<StillRaster, MediaError> {
    let mut pixels = image::load_from_memory(bytes)?.to_rgba8();
    flatten_onto_black(&mut pixels);
    log::debug!("Decoded still image: {}x{}", pixels.width(), pixels.height());
    Ok(StillRaster { pixels })
}

/// Composite translucent pixels over black and mark everything opaque.
///
/// Luminance ignores alpha, so a fully transparent pixel must read as the
/// canvas colour rather than whatever RGB it happens to carry.
pub fn flatten_onto_black(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let a = px[3] as u32;
        if a == 255 {
            continue;
        }
        for c in 0..3 {
            px[c] = ((px[c] as u32 * a + 127) / 255) as u8;
        }
        px[3] = 255;
    }
}
