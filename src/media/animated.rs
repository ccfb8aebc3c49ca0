//! Animated image adapter.
//!
//! Containers are decoded into [`Patch`]es. Turning patches into full frames
//! is the [`Compositor`]'s job: each patch is drawn over the canvas left by
//! the previous one, and a snapshot of the canvas is one frame.

use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, Frame, ImageDecoder, ImageFormat, RgbaImage};

use super::types::{AnimatedSequence, MediaError, Patch};
use crate::pipeline::CancelToken;

/// Decode an animated GIF, APNG or WebP. Any other still format becomes a
/// single full-canvas patch.
pub fn decode_animated(bytes: &[u8]) -> Result<AnimatedSequence, MediaError> {
    let sequence = match image::guess_format(bytes)? {
        ImageFormat::Gif => {
            let decoder = GifDecoder::new(Cursor::new(bytes))?;
            let (width, height) = decoder.dimensions();
            let frames = decoder.into_frames().collect_frames()?;
            sequence_from_frames(width, height, frames)
        }
        ImageFormat::Png => decode_apng(bytes).unwrap_or_else(|| single_patch(bytes))?,
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes))?;
            if decoder.has_animation() {
                let (width, height) = decoder.dimensions();
                let frames = decoder.into_frames().collect_frames()?;
                sequence_from_frames(width, height, frames)
            } else {
                single_patch(bytes)?
            }
        }
        _ => single_patch(bytes)?,
    };
    log::info!(
        "Decoded animation: {}x{}, {} patches",
        sequence.width,
        sequence.height,
        sequence.patches.len()
    );
    Ok(sequence)
}

/// `None` when the PNG carries no animation. Errors after the animation
/// chunk was found are reported, not downgraded to a still.
fn decode_apng(bytes: &[u8]) -> Option<Result<AnimatedSequence, MediaError>> {
    let decoder = PngDecoder::new(Cursor::new(bytes)).ok()?;
    if !decoder.is_apng().ok()? {
        return None;
    }
    let (width, height) = decoder.dimensions();
    let frames = match decoder.apng().and_then(|apng| apng.into_frames().collect_frames()) {
        Ok(frames) => frames,
        Err(e) => return Some(Err(e.into())),
    };
    if frames.is_empty() {
        return Some(Err(MediaError::Decode(image::ImageError::Decoding(
            image::error::DecodingError::new(
                ImageFormat::Png.into(),
                "animated PNG has no frames",
            ),
        ))));
    }
    Some(Ok(sequence_from_frames(width, height, frames)))
}

fn single_patch(bytes: &[u8]) -> Result<AnimatedSequence, MediaError> {
    let pixels = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = pixels.dimensions();
    Ok(AnimatedSequence {
        width,
        height,
        patches: vec![Patch {
            pixels,
            left: 0,
            top: 0,
            delay: Duration::ZERO,
        }],
    })
}

fn sequence_from_frames(width: u32, height: u32, frames: Vec<Frame>) -> AnimatedSequence {
    let patches = frames
        .into_iter()
        .map(|frame| {
            let left = frame.left();
            let top = frame.top();
            let delay = Duration::from(frame.delay());
            Patch {
                pixels: frame.into_buffer(),
                left,
                top,
                delay,
            }
        })
        .collect();
    AnimatedSequence {
        width,
        height,
        patches,
    }
}

/// Persistent canvas that patches are drawn onto in order.
#[derive(Debug, Clone)]
pub struct Compositor {
    canvas: RgbaImage,
}

impl Compositor {
    /// Opaque black canvas of the container's natural size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255])),
        }
    }

    /// Draw `patch` over the canvas at its offset, clipped to the canvas.
    /// Transparent patch pixels leave the previous frame showing through.
    pub fn apply(&mut self, patch: &Patch) {
        let (cw, ch) = self.canvas.dimensions();
        for (x, y, src) in patch.pixels.enumerate_pixels() {
            let cx = patch.left.saturating_add(x);
            let cy = patch.top.saturating_add(y);
            if cx >= cw || cy >= ch {
                continue;
            }
            let a = src[3] as u32;
            if a == 0 {
                continue;
            }
            let dst = self.canvas.get_pixel_mut(cx, cy);
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * a + dst[c] as u32 * (255 - a) + 127) / 255) as u8;
            }
            dst[3] = 255;
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }
}

/// Walk the sequence, handing one composited frame per patch to `sink`.
///
/// Returns the number of frames produced. Stops with
/// [`MediaError::Cancelled`] once `cancel` reports a newer run.
pub fn composite_frames(
    sequence: &AnimatedSequence,
    cancel: &CancelToken,
    mut sink: impl FnMut(RgbaImage),
) -> Result<usize, MediaError> {
    let mut compositor = Compositor::new(sequence.width, sequence.height);
    for patch in &sequence.patches {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        compositor.apply(patch);
        sink(compositor.canvas().clone());
    }
    Ok(sequence.patches.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn patch(w: u32, h: u32, left: u32, top: u32, color: [u8; 4]) -> Patch {
        Patch {
            pixels: RgbaImage::from_pixel(w, h, Rgba(color)),
            left,
            top,
            delay: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_partial_patch_keeps_previous_pixels() {
        let mut comp = Compositor::new(4, 4);
        comp.apply(&patch(4, 4, 0, 0, [255, 255, 255, 255]));
        comp.apply(&patch(2, 2, 2, 2, [0, 0, 0, 255]));
        assert_eq!(comp.canvas().get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(comp.canvas().get_pixel(3, 3), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_transparent_patch_pixels_show_through() {
        let mut comp = Compositor::new(2, 1);
        comp.apply(&patch(2, 1, 0, 0, [200, 200, 200, 255]));
        comp.apply(&patch(2, 1, 0, 0, [0, 0, 0, 0]));
        assert_eq!(comp.canvas().get_pixel(1, 0), &Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn test_patch_clipped_to_canvas() {
        let mut comp = Compositor::new(2, 2);
        comp.apply(&patch(4, 4, 1, 1, [255, 0, 0, 255]));
        assert_eq!(comp.canvas().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(comp.canvas().get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_composite_frames_one_per_patch() {
        let seq = AnimatedSequence {
            width: 2,
            height: 2,
            patches: vec![
                patch(2, 2, 0, 0, [255, 255, 255, 255]),
                patch(1, 1, 0, 0, [0, 0, 0, 255]),
                patch(1, 1, 1, 1, [0, 0, 0, 255]),
            ],
        };
        let mut frames = Vec::new();
        let n = composite_frames(&seq, &CancelToken::never(), |f| frames.push(f)).unwrap();
        assert_eq!(n, 3);
        assert_eq!(frames.len(), 3);
        // third frame carries both earlier patches
        assert_eq!(frames[2].get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(frames[2].get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(frames[2].get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_composite_frames_honours_cancel() {
        let seq = AnimatedSequence {
            width: 1,
            height: 1,
            patches: vec![patch(1, 1, 0, 0, [1, 1, 1, 255])],
        };
        let token = CancelToken::cancelled();
        let err = composite_frames(&seq, &token, |_| {}).unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for b in bytes {
            crc ^= *b as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        let start = out.len();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        let crc = crc32(&out[start..]);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    /// 1x1 APNG whose image data is not a valid zlib stream.
    fn broken_apng() -> Vec<u8> {
        let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&1u32.to_be_bytes());
        ihdr.extend_from_slice(&1u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
        chunk(&mut out, b"IHDR", &ihdr);
        let mut actl = Vec::new();
        actl.extend_from_slice(&1u32.to_be_bytes());
        actl.extend_from_slice(&0u32.to_be_bytes());
        chunk(&mut out, b"acTL", &actl);
        let mut fctl = Vec::new();
        for v in [0u32, 1, 1, 0, 0] {
            fctl.extend_from_slice(&v.to_be_bytes());
        }
        fctl.extend_from_slice(&1u16.to_be_bytes());
        fctl.extend_from_slice(&10u16.to_be_bytes());
        fctl.extend_from_slice(&[0, 0]);
        chunk(&mut out, b"fcTL", &fctl);
        chunk(&mut out, b"IDAT", &[0xFF; 8]);
        chunk(&mut out, b"IEND", &[]);
        out
    }

    #[test]
    fn test_broken_apng_reports_error() {
        let result = decode_apng(&broken_apng());
        assert!(matches!(result, Some(Err(MediaError::Decode(_)))), "got {:?}", result.map(|r| r.map(|s| s.patches.len())));
        assert!(decode_animated(&broken_apng()).is_err());
    }

    #[test]
    fn test_plain_png_is_not_apng() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        assert!(decode_apng(buf.get_ref()).is_none());
    }

    #[test]
    fn test_still_png_becomes_single_patch() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([5, 5, 5, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        let seq = decode_animated(buf.get_ref()).unwrap();
        assert_eq!((seq.width, seq.height), (3, 2));
        assert_eq!(seq.patches.len(), 1);
    }
}
