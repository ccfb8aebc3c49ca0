//! Background ingestion and rasterization runs.
//!
//! Every run is stamped with a generation number. Starting a run advances
//! the shared counter, which silently cancels anything still in flight:
//! workers poll their [`CancelToken`] between frames, and results that come
//! back with an old stamp are dropped by the receiver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::frame_cache::{build_cache, FrameCache};
use crate::media::{self, IngestSettings, LoadOptions, MediaError, MediaKind, RawMediaSource};
use crate::raster::RasterSettings;

/// Cancellation handle for one run.
#[derive(Debug, Clone)]
pub struct CancelToken {
    current: Arc<AtomicU64>,
    generation: u64,
}

impl CancelToken {
    /// A token that is never cancelled, for one-shot work.
    pub fn never() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            generation: 0,
        }
    }

    /// A token that is already cancelled.
    pub fn cancelled() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(1)),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once a newer run has started.
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }
}

/// Monotonically increasing run counter shared with every token.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Start a new run, invalidating every older token.
    pub fn advance(&self) -> CancelToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        CancelToken {
            current: Arc::clone(&self.current),
            generation,
        }
    }
}

/// Completion message from a background run.
#[derive(Debug)]
pub enum PipelineEvent {
    /// A locator finished loading.
    Loaded {
        generation: u64,
        result: Result<Arc<RawMediaSource>, MediaError>,
    },
    /// A frame cache finished building.
    Built {
        generation: u64,
        result: Result<FrameCache, MediaError>,
    },
}

impl PipelineEvent {
    pub fn generation(&self) -> u64 {
        match self {
            PipelineEvent::Loaded { generation, .. } | PipelineEvent::Built { generation, .. } => {
                *generation
            }
        }
    }
}

/// Launches runs on the tokio runtime and reports them on one channel.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Pipeline {
    generation: Generation,
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl Pipeline {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                generation: Generation::new(),
                events: tx,
            },
            rx,
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.is_current(generation)
    }

    /// Invalidate whatever is in flight without starting new work.
    pub fn cancel(&self) -> u64 {
        self.generation.advance().generation()
    }

    /// Load a locator in the background. Returns the run's generation.
    pub fn load(&self, locator: String, kind: MediaKind, options: LoadOptions) -> u64 {
        let token = self.generation.advance();
        let generation = token.generation();
        let tx = self.events.clone();
        log::debug!("Starting load gen={} locator={}", generation, locator);

        tokio::spawn(async move {
            let result = media::load(&locator, kind, &options).await.map(Arc::new);
            if token.is_cancelled() {
                log::debug!("Load gen={} finished after being superseded", generation);
            }
            let _ = tx.send(PipelineEvent::Loaded { generation, result });
        });
        generation
    }

    /// Ingest and rasterize `source` on the blocking pool. Returns the run's
    /// generation.
    pub fn rebuild(
        &self,
        source: Arc<RawMediaSource>,
        ingest: IngestSettings,
        raster: RasterSettings,
    ) -> u64 {
        let token = self.generation.advance();
        let generation = token.generation();
        let tx = self.events.clone();
        log::debug!(
            "Starting rebuild gen={} width={} fps={}",
            generation,
            raster.grid_width,
            ingest.target_fps
        );

        tokio::task::spawn_blocking(move || {
            let result = build_cache(&source, &ingest, &raster, &token);
            let _ = tx.send(PipelineEvent::Built { generation, result });
        });
        generation
    }
}
