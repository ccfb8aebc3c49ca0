//! Media types and data structures.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::video::SeekableVideo;

/// Declared format of a media locator. Never auto-detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    #[serde(alias = "image")]
    StillImage,
    #[default]
    #[serde(alias = "gif")]
    AnimatedImage,
    Video,
}

impl MediaKind {
    pub fn name(&self) -> &'static str {
        match self {
            MediaKind::StillImage => "still-image",
            MediaKind::AnimatedImage => "animated-image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "still-image" | "image" | "still" => Ok(MediaKind::StillImage),
            "animated-image" | "gif" | "animated" => Ok(MediaKind::AnimatedImage),
            "video" => Ok(MediaKind::Video),
            other => Err(format!(
                "unknown media kind '{}' (expected still-image, animated-image or video)",
                other
            )),
        }
    }
}

/// A single decoded raster.
#[derive(Debug, Clone)]
pub struct StillRaster {
    /// Opaque RGBA pixels at natural size
    pub pixels: RgbaImage,
}

impl StillRaster {
    pub fn natural_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// One timed frame of an animated container, placed at an offset on the
/// container's canvas. May cover only part of the canvas.
#[derive(Debug, Clone)]
pub struct Patch {
    pub pixels: RgbaImage,
    pub left: u32,
    pub top: u32,
    /// Authored inter-frame delay (playback uses the configured fps instead)
    pub delay: Duration,
}

/// Ordered patches plus the natural canvas size they composite onto.
#[derive(Debug, Clone)]
pub struct AnimatedSequence {
    pub width: u32,
    pub height: u32,
    pub patches: Vec<Patch>,
}

impl AnimatedSequence {
    /// Authored delays in frame order.
    pub fn delays(&self) -> Vec<Duration> {
        self.patches.iter().map(|p| p.delay).collect()
    }
}

/// A loaded media source, owned by the ingestion stage.
pub enum RawMediaSource {
    Still(StillRaster),
    Animated(AnimatedSequence),
    Video(Box<dyn SeekableVideo>),
}

impl RawMediaSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            RawMediaSource::Still(_) => MediaKind::StillImage,
            RawMediaSource::Animated(_) => MediaKind::AnimatedImage,
            RawMediaSource::Video(_) => MediaKind::Video,
        }
    }

    /// Natural `(width, height)` in pixels.
    pub fn natural_size(&self) -> (u32, u32) {
        match self {
            RawMediaSource::Still(s) => s.natural_size(),
            RawMediaSource::Animated(a) => (a.width, a.height),
            RawMediaSource::Video(v) => v.dimensions(),
        }
    }
}

impl fmt::Debug for RawMediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawMediaSource::Still(s) => f
                .debug_tuple("Still")
                .field(&s.natural_size())
                .finish(),
            RawMediaSource::Animated(a) => f
                .debug_struct("Animated")
                .field("width", &a.width)
                .field("height", &a.height)
                .field("patches", &a.patches.len())
                .finish(),
            RawMediaSource::Video(v) => f.debug_tuple("Video").field(v).finish(),
        }
    }
}

/// Settings read by ingestion for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    pub target_fps: u32,
    /// Upper bound on frames captured from a video
    pub frame_limit: u32,
    pub seek_timeout: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            target_fps: 30,
            frame_limit: 120,
            seek_timeout: Duration::from_secs(5),
        }
    }
}

/// Settings read while loading a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Largest resource fetched into memory
    pub max_bytes: u64,
    /// Bound on probing a video container
    pub probe_timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Errors that can occur while loading or ingesting media.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to load '{locator}': {reason}")]
    Load { locator: String, reason: String },

    #[error("seek to {timestamp:?} timed out after {timeout:?}")]
    SeekTimeout {
        timestamp: Duration,
        timeout: Duration,
    },

    #[error("no frame available at {timestamp:?}")]
    NoFrame { timestamp: Duration },

    #[error("ffmpeg/ffprobe not found on PATH")]
    FfmpegNotFound,

    #[error("failed to decode media: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("resource exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("ingestion superseded by a newer run")]
    Cancelled,
}

impl MediaError {
    /// Errors recovered by skipping a single video frame.
    pub fn is_frame_skippable(&self) -> bool {
        matches!(self, MediaError::SeekTimeout { .. } | MediaError::NoFrame { .. })
    }

    pub(crate) fn load(locator: &str, reason: impl Into<String>) -> Self {
        MediaError::Load {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }
}
