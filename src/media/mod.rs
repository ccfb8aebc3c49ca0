//! Media ingestion adapters.
//!
//! A locator plus its declared [`MediaKind`] is loaded into a
//! [`RawMediaSource`], which then yields an ordered run of opaque RGBA
//! frames for the rasterizer:
//!
//! - **Still image** - exactly one frame
//! - **Animated image** - one composited frame per patch
//! - **Video** - up to `frame_limit` frames sampled by seeking

mod animated;
mod fetch;
mod still;
mod types;
mod video;

pub use animated::{composite_frames, decode_animated, Compositor};
pub use fetch::{fetch_bytes, is_remote};
pub use still::{decode_still, flatten_onto_black};
pub use types::{
    AnimatedSequence, IngestSettings, LoadOptions, MediaError, MediaKind, Patch,
    RawMediaSource, StillRaster,
};
pub use video::{capture_frames, frame_timestamps, FfmpegVideo, SeekableVideo};

use image::RgbaImage;

use crate::pipeline::CancelToken;

/// Load `locator` as the declared `kind`.
///
/// Image bytes are fetched asynchronously; decoding and video probing run on
/// the blocking pool.
pub async fn load(
    locator: &str,
    kind: MediaKind,
    options: &LoadOptions,
) -> Result<RawMediaSource, MediaError> {
    log::info!("Loading {} from {}", kind, locator);
    match kind {
        MediaKind::StillImage => {
            let bytes = fetch_bytes(locator, options.max_bytes).await?;
            let still = blocking(move || decode_still(&bytes)).await?;
            Ok(RawMediaSource::Still(still))
        }
        MediaKind::AnimatedImage => {
            let bytes = fetch_bytes(locator, options.max_bytes).await?;
            let sequence = blocking(move || decode_animated(&bytes)).await?;
            if sequence.patches.is_empty() {
                return Err(MediaError::load(locator, "animation has no frames"));
            }
            Ok(RawMediaSource::Animated(sequence))
        }
        MediaKind::Video => {
            if locator.trim().is_empty() {
                return Err(MediaError::load(locator, "empty locator"));
            }
            let owned = locator.to_string();
            let timeout = options.probe_timeout;
            let video = blocking(move || FfmpegVideo::probe(&owned, timeout)).await?;
            Ok(RawMediaSource::Video(Box::new(video)))
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, MediaError>
where
    F: FnOnce() -> Result<T, MediaError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))?
}

impl RawMediaSource {
    /// Produce every frame in playback order, handing each to `sink` as soon
    /// as it exists. Returns the number of frames produced.
    ///
    /// Blocking: video sources spawn one subprocess per frame.
    pub fn visit_frames(
        &self,
        settings: &IngestSettings,
        cancel: &CancelToken,
        mut sink: impl FnMut(RgbaImage),
    ) -> Result<usize, MediaError> {
        match self {
            RawMediaSource::Still(still) => {
                if cancel.is_cancelled() {
                    return Err(MediaError::Cancelled);
                }
                sink(still.pixels.clone());
                Ok(1)
            }
            RawMediaSource::Animated(sequence) => composite_frames(sequence, cancel, sink),
            RawMediaSource::Video(video) => capture_frames(video.as_ref(), settings, cancel, sink),
        }
    }

    /// Collect every frame. Prefer [`visit_frames`](Self::visit_frames) for
    /// long sources.
    pub fn frames(
        &self,
        settings: &IngestSettings,
        cancel: &CancelToken,
    ) -> Result<Vec<RgbaImage>, MediaError> {
        let mut frames = Vec::new();
        self.visit_frames(settings, cancel, |f| frames.push(f))?;
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_still_yields_exactly_one_frame() {
        let source = RawMediaSource::Still(StillRaster {
            pixels: RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])),
        });
        let frames = source
            .frames(&IngestSettings::default(), &CancelToken::never())
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(source.kind(), MediaKind::StillImage);
        assert_eq!(source.natural_size(), (3, 3));
    }

    #[tokio::test]
    async fn test_load_missing_still_is_load_error() {
        let err = load("/no/such/file.png", MediaKind::StillImage, &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Load { .. }));
    }

    #[tokio::test]
    async fn test_load_video_with_empty_locator() {
        let err = load("", MediaKind::Video, &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Load { .. }));
    }
}
