//! Playback scheduler: which cached frame is on screen right now.
//!
//! Pure state machine driven by explicit `Instant`s so it can be stepped
//! deterministically; the engine feeds it wall-clock ticks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::frame_cache::FrameCache;
use crate::raster::GlyphGrid;

/// Display state of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    /// No media configured.
    Idle,
    /// Media is loading; nothing to show yet.
    Loading,
    /// A cache is installed and `frame_index` is on screen.
    Ready { frame_index: usize },
    /// The last load failed and there is nothing to show.
    Failed { reason: String },
}

/// Shown when the scheduler has no frame to display.
pub const LOADING_TEXT: &str = "LOADING...";

/// What a presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub ready: bool,
    pub current_grid: Option<GlyphGrid>,
    pub frame_index: usize,
    pub frame_count: usize,
    /// A rebuild is running while the previous cache keeps playing.
    pub rebuilding: bool,
    pub state: PlaybackState,
}

#[derive(Debug)]
pub struct PlaybackScheduler {
    state: PlaybackState,
    cache: Option<Arc<FrameCache>>,
    frame_interval: Duration,
    last_advance: Option<Instant>,
    rebuilding: bool,
}

impl PlaybackScheduler {
    pub fn new(target_fps: u32) -> Self {
        Self {
            state: PlaybackState::Idle,
            cache: None,
            frame_interval: interval_for(target_fps),
            last_advance: None,
            rebuilding: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn cache(&self) -> Option<&Arc<FrameCache>> {
        self.cache.as_ref()
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding
    }

    /// Change the playback rate. The next advance is measured from the last
    /// one using the new interval.
    pub fn set_fps(&mut self, target_fps: u32) {
        self.frame_interval = interval_for(target_fps);
    }

    /// Back to [`PlaybackState::Idle`] with nothing cached.
    pub fn clear(&mut self) {
        self.state = PlaybackState::Idle;
        self.cache = None;
        self.last_advance = None;
        self.rebuilding = false;
    }

    /// New media is loading: the old cache no longer describes it.
    pub fn begin_loading(&mut self) {
        self.state = PlaybackState::Loading;
        self.cache = None;
        self.last_advance = None;
        self.rebuilding = false;
    }

    /// A rebuild of the same media started. An installed cache keeps
    /// playing until the replacement arrives.
    pub fn begin_rebuild(&mut self) {
        if self.cache.is_some() {
            self.rebuilding = true;
        } else {
            self.state = PlaybackState::Loading;
        }
    }

    /// Swap in a freshly built cache and restart at frame 0.
    pub fn install(&mut self, cache: Arc<FrameCache>, now: Instant) {
        self.frame_interval = cache.frame_interval();
        self.cache = Some(cache);
        self.state = PlaybackState::Ready { frame_index: 0 };
        self.last_advance = Some(now);
        self.rebuilding = false;
    }

    /// A load or rebuild failed. With a cache installed the last good frames
    /// keep playing; otherwise the failure is shown.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.rebuilding = false;
        if self.cache.is_none() {
            self.state = PlaybackState::Failed {
                reason: reason.into(),
            };
        }
    }

    /// Advance by at most one frame if a full interval has elapsed.
    ///
    /// The remainder of the elapsed time is carried over, so a late tick
    /// shortens the next wait instead of shifting every later frame.
    /// Returns true when the frame index moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let len = match &self.cache {
            Some(cache) => cache.len(),
            None => return false,
        };
        let PlaybackState::Ready { frame_index } = &mut self.state else {
            return false;
        };
        if len == 0 {
            return false;
        }

        let last = *self.last_advance.get_or_insert(now);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.frame_interval {
            return false;
        }

        let previous = *frame_index;
        *frame_index = (*frame_index + 1) % len;
        let carry = remainder(elapsed, self.frame_interval);
        self.last_advance = Some(now - carry);
        *frame_index != previous
    }

    /// When the next advance is due, if playback is running.
    pub fn next_advance_at(&self) -> Option<Instant> {
        match (&self.state, &self.cache, self.last_advance) {
            (PlaybackState::Ready { .. }, Some(cache), Some(last)) if cache.len() > 1 => {
                Some(last + self.frame_interval)
            }
            _ => None,
        }
    }

    pub fn frame_index(&self) -> Option<usize> {
        match self.state {
            PlaybackState::Ready { frame_index } => Some(frame_index),
            _ => None,
        }
    }

    pub fn current_grid(&self) -> Option<&GlyphGrid> {
        let index = self.frame_index()?;
        self.cache.as_ref()?.get(index)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let current_grid = self.current_grid().cloned();
        PlaybackSnapshot {
            ready: current_grid.is_some(),
            current_grid,
            frame_index: self.frame_index().unwrap_or(0),
            frame_count: self.cache.as_ref().map(|c| c.len()).unwrap_or(0),
            rebuilding: self.rebuilding,
            state: self.state.clone(),
        }
    }
}

fn interval_for(target_fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_fps.max(1) as f64)
}

fn remainder(elapsed: Duration, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos();
    if interval_ns == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((elapsed.as_nanos() % interval_ns) as u64)
}
