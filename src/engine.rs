//! The renderer engine: configuration in, a stream of frame snapshots out.
//!
//! [`Engine`] owns the configuration store, the background pipeline and the
//! playback scheduler. Its methods take explicit instants so the state
//! machine can be driven step by step; [`Engine::run`] wires them to a
//! `tokio::select!` loop and [`Engine::spawn`] runs that loop as a task.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{Config, ConfigError, Rgb};
use crate::media::{MediaError, RawMediaSource};
use crate::pipeline::{Pipeline, PipelineEvent};
use crate::playback::{PlaybackScheduler, PlaybackState};
use crate::raster::GlyphGrid;
use crate::store::{ConfigStore, StoreAction};

/// Presentation-only values, passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub glyph_color: Rgb,
    pub background_color: Rgb,
    pub glow_intensity: f32,
    pub display_scale: f32,
}

impl Style {
    pub fn from_config(config: &Config) -> Self {
        Self {
            glyph_color: config.glyph_color,
            background_color: config.background_color,
            glow_intensity: config.glow_intensity,
            display_scale: config.display_scale,
        }
    }
}

/// Everything a presentation layer needs to draw the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub ready: bool,
    pub current_grid: Option<GlyphGrid>,
    pub frame_index: usize,
    pub frame_count: usize,
    pub state: PlaybackState,
    pub rebuilding: bool,
    /// Generation of the cache on screen
    pub cache_generation: Option<u64>,
    pub style: Style,
}

/// Messages accepted by a spawned engine.
#[derive(Debug)]
pub enum EngineCommand {
    Update(Config),
    SetField { key: String, value: String },
    Shutdown,
}

pub struct Engine {
    store: ConfigStore,
    scheduler: PlaybackScheduler,
    pipeline: Pipeline,
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    media: Option<Arc<RawMediaSource>>,
    loading: bool,
    snapshots: watch::Sender<Snapshot>,
}

impl Engine {
    /// Create an idle engine. Must be called from within a tokio runtime
    /// before any work is started.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = PlaybackScheduler::new(config.target_fps);
        let (pipeline, events) = Pipeline::new();
        let store = ConfigStore::new(config);
        let initial = Self::build_snapshot(&scheduler, store.config());
        let (snapshots, _) = watch::channel(initial);
        Ok(Self {
            store,
            scheduler,
            pipeline,
            events,
            media: None,
            loading: false,
            snapshots,
        })
    }

    /// Start the engine loop on the current runtime.
    pub fn spawn(config: Config) -> Result<EngineHandle, ConfigError> {
        let engine = Self::new(config)?;
        let snapshots = engine.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(engine.run(rx));
        Ok(EngineHandle {
            commands: tx,
            snapshots,
            task,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    pub fn config(&self) -> &Config {
        self.store.config()
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn media(&self) -> Option<&Arc<RawMediaSource>> {
        self.media.as_ref()
    }

    /// Latest generation handed to the pipeline.
    pub fn generation(&self) -> u64 {
        self.pipeline.generation()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Kick off the initial load, if a locator is configured.
    pub fn start(&mut self) {
        if !self.store.config().media_locator.trim().is_empty() {
            self.reingest();
        }
    }

    /// Replace the whole configuration.
    pub fn apply(&mut self, config: Config, now: Instant) -> Result<StoreAction, ConfigError> {
        let action = self.store.set(config, now)?;
        self.react(action);
        Ok(action)
    }

    /// Apply one `key=value` edit.
    pub fn set_field(&mut self, key: &str, value: &str, now: Instant) -> Result<StoreAction, ConfigError> {
        let action = self.store.set_field(key, value, now)?;
        self.react(action);
        Ok(action)
    }

    fn react(&mut self, action: StoreAction) {
        match action {
            StoreAction::Reingest => self.reingest(),
            StoreAction::Restyle => self.publish(),
            StoreAction::Deferred | StoreAction::None => {}
        }
    }

    /// Use an already decoded source instead of loading the configured
    /// locator, and build its cache immediately.
    pub fn set_media(&mut self, source: Arc<RawMediaSource>) {
        self.loading = false;
        self.media = Some(source);
        self.scheduler.begin_loading();
        self.rebuild_now();
    }

    fn reingest(&mut self) {
        self.media = None;
        let config = self.store.config();
        if config.media_locator.trim().is_empty() {
            self.pipeline.cancel();
            self.loading = false;
            self.scheduler.clear();
        } else {
            self.loading = true;
            self.scheduler.begin_loading();
            self.pipeline.load(
                config.media_locator.clone(),
                config.media_kind,
                config.load_options(),
            );
        }
        self.publish();
    }

    /// Start a rebuild of the loaded media with the current settings,
    /// bypassing the debounce window.
    pub fn rebuild_now(&mut self) {
        let Some(source) = self.media.clone() else {
            return;
        };
        let config = self.store.config();
        let raster = match config.raster_settings() {
            Ok(raster) => raster,
            Err(e) => {
                log::error!("Cannot rebuild frame cache: {}", e);
                self.scheduler.fail(e.to_string());
                self.publish();
                return;
            }
        };
        self.scheduler.begin_rebuild();
        self.pipeline.rebuild(source, config.ingest_settings(), raster);
        self.publish();
    }

    /// Fire the debounced rebuild if its window has settled.
    pub fn poll_debounce(&mut self, now: Instant) {
        if !self.store.poll_rebuild(now) {
            return;
        }
        if self.media.is_some() {
            self.rebuild_now();
        } else if self.loading {
            log::debug!("Load in flight; it will build with the latest settings");
        } else if !self.store.config().media_locator.trim().is_empty() {
            log::info!("Settings changed after a failed load; reloading media");
            self.reingest();
        }
    }

    /// Wait for the next background result.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Fold a background result into the engine state. Results from
    /// superseded runs are dropped.
    pub fn handle_event(&mut self, event: PipelineEvent, now: Instant) {
        let generation = event.generation();
        if !self.pipeline.is_current(generation) {
            log::debug!(
                "Discarding stale result gen={} (current gen={})",
                generation,
                self.pipeline.generation()
            );
            return;
        }

        match event {
            PipelineEvent::Loaded { result, .. } => {
                self.loading = false;
                match result {
                    Ok(source) => {
                        log::info!("Media loaded: {:?}", source);
                        self.media = Some(source);
                        self.rebuild_now();
                    }
                    Err(e) => {
                        log::error!("Failed to load media: {}", e);
                        self.media = None;
                        self.scheduler.fail(e.to_string());
                    }
                }
            }
            PipelineEvent::Built { result, .. } => match result {
                Ok(cache) => {
                    log::info!(
                        "Installing frame cache gen={} ({} frames)",
                        cache.generation(),
                        cache.len()
                    );
                    self.scheduler.install(Arc::new(cache), now);
                }
                Err(MediaError::Cancelled) => {}
                Err(e) => {
                    log::error!("Frame cache rebuild failed: {}", e);
                    self.scheduler.fail(e.to_string());
                }
            },
        }
        self.publish();
    }

    /// Advance playback; publishes when the frame changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let advanced = self.scheduler.tick(now);
        if advanced {
            self.publish();
        }
        advanced
    }

    pub fn snapshot(&self) -> Snapshot {
        Self::build_snapshot(&self.scheduler, self.store.config())
    }

    fn build_snapshot(scheduler: &PlaybackScheduler, config: &Config) -> Snapshot {
        let playback = scheduler.snapshot();
        Snapshot {
            ready: playback.ready,
            current_grid: playback.current_grid,
            frame_index: playback.frame_index,
            frame_count: playback.frame_count,
            state: playback.state,
            rebuilding: playback.rebuilding,
            cache_generation: scheduler.cache().map(|c| c.generation()),
            style: Style::from_config(config),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    /// Drive the engine until shutdown or until every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<EngineCommand>) {
        self.start();

        loop {
            let debounce_at = self.store.deadline();
            let advance_at = self.scheduler.next_advance_at();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(EngineCommand::Update(config)) => {
                        if let Err(e) = self.apply(config, Instant::now()) {
                            log::warn!("Rejected config update: {}", e);
                        }
                    }
                    Some(EngineCommand::SetField { key, value }) => {
                        if let Err(e) = self.set_field(&key, &value, Instant::now()) {
                            log::warn!("Rejected {}={}: {}", key, value, e);
                        }
                    }
                    Some(EngineCommand::Shutdown) | None => break,
                },

                Some(event) = self.events.recv() => {
                    self.handle_event(event, Instant::now());
                }

                _ = sleep_until(debounce_at) => {
                    self.poll_debounce(Instant::now());
                }

                _ = sleep_until(advance_at) => {
                    self.tick(Instant::now());
                }
            }
        }

        self.pipeline.cancel();
        log::info!("Engine stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

/// Handle to a spawned [`Engine`].
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Replace the configuration. Returns false once the engine has stopped.
    pub fn update(&self, config: Config) -> bool {
        self.commands.send(EngineCommand::Update(config)).is_ok()
    }

    /// Apply one `key=value` edit.
    pub fn set_field(&self, key: &str, value: &str) -> bool {
        self.commands
            .send(EngineCommand::SetField {
                key: key.to_string(),
                value: value.to_string(),
            })
            .is_ok()
    }

    /// Receiver of every published snapshot.
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the engine and wait for its task to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(EngineCommand::Shutdown);
        if let Err(e) = self.task.await {
            log::warn!("Engine task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StillRaster;
    use image::{Rgba, RgbaImage};
    use std::time::Duration;

    fn still(v: u8) -> Arc<RawMediaSource> {
        Arc::new(RawMediaSource::Still(StillRaster {
            pixels: RgbaImage::from_pixel(8, 8, Rgba([v, v, v, 255])),
        }))
    }

    fn config() -> Config {
        Config {
            grid_width: 4,
            contrast: 1.0,
            charset: "blocks".to_string(),
            ..Config::default()
        }
    }

    async fn settle(engine: &mut Engine) {
        while engine.scheduler().is_rebuilding()
            || !matches!(engine.scheduler().state(), PlaybackState::Ready { .. })
        {
            let event = tokio::time::timeout(Duration::from_secs(5), engine.next_event())
                .await
                .expect("pipeline event")
                .expect("channel open");
            engine.handle_event(event, Instant::now());
        }
    }

    #[tokio::test]
    async fn test_set_media_builds_cache() {
        let mut engine = Engine::new(config()).unwrap();
        engine.set_media(still(255));
        settle(&mut engine).await;
        let snap = engine.snapshot();
        assert!(snap.ready);
        assert_eq!(snap.frame_count, 1);
        assert_eq!(snap.current_grid.unwrap().as_str(), "████\n████");
    }

    #[tokio::test]
    async fn test_glow_change_keeps_cache() {
        let mut engine = Engine::new(config()).unwrap();
        engine.set_media(still(255));
        settle(&mut engine).await;
        let generation = engine.generation();
        let cache = Arc::clone(engine.scheduler().cache().unwrap());

        let action = engine.set_field("glow_intensity", "0", Instant::now()).unwrap();
        assert_eq!(action, StoreAction::Restyle);
        assert_eq!(engine.generation(), generation);
        assert!(Arc::ptr_eq(engine.scheduler().cache().unwrap(), &cache));
        assert_eq!(engine.snapshot().style.glow_intensity, 0.0);
    }

    #[tokio::test]
    async fn test_stale_build_is_discarded() {
        let mut engine = Engine::new(config()).unwrap();
        engine.set_media(still(255));
        let first = engine.generation();
        engine.set_field("grid_width", "2", Instant::now()).unwrap();
        engine.rebuild_now();
        let second = engine.generation();
        assert!(second > first);

        let mut seen = 0;
        while seen < 2 {
            let event = tokio::time::timeout(Duration::from_secs(5), engine.next_event())
                .await
                .unwrap()
                .unwrap();
            engine.handle_event(event, Instant::now());
            seen += 1;
        }
        let snap = engine.snapshot();
        assert_eq!(snap.cache_generation, Some(second));
        assert_eq!(snap.current_grid.unwrap().width(), 2);
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected() {
        let mut engine = Engine::new(config()).unwrap();
        let err = engine.set_field("target_fps", "0", Instant::now());
        assert!(err.is_err());
        assert_eq!(engine.config().target_fps, 30);
    }

    #[tokio::test]
    async fn test_failed_load_is_reported() {
        let mut engine = Engine::new(Config {
            media_locator: "/no/such/anim.gif".to_string(),
            ..config()
        })
        .unwrap();
        engine.start();
        assert!(engine.is_loading());
        let event = engine.next_event().await.unwrap();
        engine.handle_event(event, Instant::now());
        assert!(matches!(engine.snapshot().state, PlaybackState::Failed { .. }));
        assert!(!engine.snapshot().ready);
    }

    #[tokio::test]
    async fn test_clearing_locator_goes_idle() {
        let mut engine = Engine::new(config()).unwrap();
        engine.set_field("media_locator", "a.gif", Instant::now()).unwrap();
        engine.set_field("media_locator", "", Instant::now()).unwrap();
        assert_eq!(engine.snapshot().state, PlaybackState::Idle);
        assert!(!engine.is_loading());
    }
}
