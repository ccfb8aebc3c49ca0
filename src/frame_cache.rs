//! FrameCache - the ordered glyph grids produced by one pipeline run.

use std::time::Duration;

use image::RgbaImage;
use rayon::prelude::*;

use crate::media::{IngestSettings, MediaError, RawMediaSource};
use crate::pipeline::CancelToken;
use crate::raster::{rasterize, GlyphGrid, RasterSettings};

/// Immutable result of one rasterization run, stamped with the generation
/// that produced it. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCache {
    generation: u64,
    grids: Vec<GlyphGrid>,
    target_fps: u32,
}

impl FrameCache {
    pub fn new(generation: u64, grids: Vec<GlyphGrid>, target_fps: u32) -> Self {
        Self {
            generation,
            grids,
            target_fps: target_fps.max(1),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GlyphGrid> {
        self.grids.get(index)
    }

    pub fn grids(&self) -> &[GlyphGrid] {
        &self.grids
    }

    /// Playback rate the cache was built for.
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }
}

/// Rasterize `frames` in parallel. Output order matches input order
/// regardless of which worker finishes first.
pub fn rasterize_all(frames: &[RgbaImage], settings: &RasterSettings) -> Vec<GlyphGrid> {
    frames
        .par_iter()
        .map(|frame| rasterize(frame, settings))
        .collect()
}

/// Accumulates frames as ingestion produces them and rasterizes them in
/// parallel batches, so only one batch of full-size frames is held at once.
pub struct CacheBuilder<'a> {
    settings: &'a RasterSettings,
    batch: Vec<RgbaImage>,
    batch_size: usize,
    grids: Vec<GlyphGrid>,
    skipped: usize,
}

impl<'a> CacheBuilder<'a> {
    pub fn new(settings: &'a RasterSettings) -> Self {
        Self::with_batch_size(settings, rayon::current_num_threads() * 2)
    }

    pub fn with_batch_size(settings: &'a RasterSettings, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            settings,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            grids: Vec::new(),
            skipped: 0,
        }
    }

    pub fn push(&mut self, frame: RgbaImage) {
        self.batch.push(frame);
        if self.batch.len() >= self.batch_size {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let grids = rasterize_all(&self.batch, self.settings);
        self.batch.clear();
        for grid in grids {
            // an empty grid means the source frame was unreadable
            if grid.is_empty() {
                self.skipped += 1;
            } else {
                self.grids.push(grid);
            }
        }
    }

    /// Rasterize whatever is left and return the grids in frame order.
    pub fn finish(mut self) -> Vec<GlyphGrid> {
        self.flush();
        if self.skipped > 0 {
            log::warn!("Skipped {} unreadable frames", self.skipped);
        }
        self.grids
    }
}

/// Run ingestion and rasterization for one generation.
pub fn build_cache(
    source: &RawMediaSource,
    ingest: &IngestSettings,
    raster: &RasterSettings,
    cancel: &CancelToken,
) -> Result<FrameCache, MediaError> {
    let started = std::time::Instant::now();
    let mut builder = CacheBuilder::new(raster);
    source.visit_frames(ingest, cancel, |frame| builder.push(frame))?;
    let grids = builder.finish();
    if cancel.is_cancelled() {
        return Err(MediaError::Cancelled);
    }
    log::info!(
        "Built frame cache gen={} frames={} grid={}x{} in {:?}",
        cancel.generation(),
        grids.len(),
        grids.first().map(|g| g.width()).unwrap_or(0),
        grids.first().map(|g| g.height()).unwrap_or(0),
        started.elapsed()
    );
    Ok(FrameCache::new(cancel.generation(), grids, ingest.target_fps))
}
