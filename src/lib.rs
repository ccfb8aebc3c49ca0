//! textreel - render still images, animated images and video as text art.
//!
//! Each source frame is reduced to a grid of glyphs chosen by luminance.
//! A [`config::Config`] describes the media and the rendering knobs; the
//! [`engine::Engine`] loads the media, rasterizes every frame into a
//! [`frame_cache::FrameCache`] on background workers and plays it back at
//! the configured rate.

pub mod ascii;
pub mod cli;
pub mod config;
pub mod engine;
pub mod frame_cache;
pub mod media;
pub mod pipeline;
pub mod playback;
pub mod raster;
pub mod renderer;
pub mod store;

pub use config::Config;
pub use engine::{Engine, EngineHandle, Snapshot};
pub use raster::{rasterize, GlyphGrid, RasterSettings};
