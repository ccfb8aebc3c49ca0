//! Configuration store with debounced rebuild triggering.

use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::config::{ChangeImpact, Config, ConfigError};

/// Coalesces a burst of changes into one trigger that fires `window` after
/// the last change.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Record a change, pushing the deadline out to `now + window`.
    pub fn note(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop any pending trigger.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once per burst, when `now` has reached the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// What the pipeline must do in response to a store change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// Nothing changed.
    None,
    /// Redraw with new presentation values.
    Restyle,
    /// A rebuild is scheduled once the debounce window settles.
    Deferred,
    /// Reload the media now.
    Reingest,
}

/// Holds the live [`Config`] and notifies subscribers of every accepted
/// change.
#[derive(Debug)]
pub struct ConfigStore {
    config: Config,
    debouncer: Debouncer,
    subscribers: watch::Sender<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        let debouncer = Debouncer::new(config.debounce());
        let (subscribers, _) = watch::channel(config.clone());
        Self {
            config,
            debouncer,
            subscribers,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Receive every accepted configuration.
    pub fn subscribe(&self) -> watch::Receiver<Config> {
        self.subscribers.subscribe()
    }

    /// When the pending rebuild fires, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Replace the configuration. Invalid records are rejected and the
    /// current one kept.
    pub fn set(&mut self, next: Config, now: Instant) -> Result<StoreAction, ConfigError> {
        next.validate()?;
        let impact = self.config.impact_of(&next);
        if impact == ChangeImpact::None {
            return Ok(StoreAction::None);
        }

        self.debouncer.set_window(next.debounce());
        self.config = next;
        self.subscribers.send_replace(self.config.clone());

        let action = match impact {
            ChangeImpact::MediaIdentity => {
                // reingest rebuilds with the latest values anyway
                self.debouncer.cancel();
                StoreAction::Reingest
            }
            ChangeImpact::Rasterization => {
                self.debouncer.note(now);
                StoreAction::Deferred
            }
            ChangeImpact::Presentation | ChangeImpact::None => StoreAction::Restyle,
        };
        log::debug!("Config change {:?} -> {:?}", impact, action);
        Ok(action)
    }

    /// Apply a single `key=value` edit.
    pub fn set_field(&mut self, key: &str, value: &str, now: Instant) -> Result<StoreAction, ConfigError> {
        let mut next = self.config.clone();
        next.set_field(key, value)?;
        self.set(next, now)
    }

    /// True when the debounced rebuild is due; fires once per burst.
    pub fn poll_rebuild(&mut self, now: Instant) -> bool {
        self.debouncer.poll(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConfigStore {
        ConfigStore::new(Config {
            media_locator: "clip.gif".to_string(),
            ..Config::default()
        })
    }

    #[test]
    fn test_debouncer_fires_once_after_last_change() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));
        d.note(t0);
        d.note(t0 + Duration::from_millis(150));
        assert!(!d.poll(t0 + Duration::from_millis(300)));
        assert!(d.poll(t0 + Duration::from_millis(350)));
        assert!(!d.poll(t0 + Duration::from_millis(400)));
    }

    #[test]
    fn test_debouncer_idle_never_fires() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        assert!(!d.poll(Instant::now() + Duration::from_secs(1)));
        assert!(!d.is_pending());
    }

    #[test]
    fn test_slider_burst_coalesces() {
        let t0 = Instant::now();
        let mut s = store();
        for i in 0..10u64 {
            let action = s
                .set_field("grid_width", &(100 + i).to_string(), t0 + Duration::from_millis(i * 16))
                .unwrap();
            assert_eq!(action, StoreAction::Deferred);
        }
        let last = t0 + Duration::from_millis(9 * 16);
        assert!(!s.poll_rebuild(last + Duration::from_millis(199)));
        assert!(s.poll_rebuild(last + Duration::from_millis(200)));
        assert!(!s.poll_rebuild(last + Duration::from_millis(400)));
        assert_eq!(s.config().grid_width, 109);
    }

    #[test]
    fn test_media_change_bypasses_debounce() {
        let t0 = Instant::now();
        let mut s = store();
        s.set_field("contrast", "2", t0).unwrap();
        assert!(s.deadline().is_some());
        let action = s.set_field("media_locator", "other.gif", t0).unwrap();
        assert_eq!(action, StoreAction::Reingest);
        assert!(s.deadline().is_none());
    }

    #[test]
    fn test_presentation_change_schedules_nothing() {
        let mut s = store();
        let action = s.set_field("glow_intensity", "3", Instant::now()).unwrap();
        assert_eq!(action, StoreAction::Restyle);
        assert!(s.deadline().is_none());
    }

    #[test]
    fn test_unchanged_value_is_noop() {
        let mut s = store();
        let action = s.set_field("grid_width", "200", Instant::now()).unwrap();
        assert_eq!(action, StoreAction::None);
    }

    #[test]
    fn test_invalid_change_keeps_current_config() {
        let mut s = store();
        assert!(s.set_field("grid_width", "0", Instant::now()).is_err());
        assert_eq!(s.config().grid_width, 200);
        assert!(s.deadline().is_none());
    }

    #[test]
    fn test_subscribers_see_accepted_changes() {
        let mut s = store();
        let rx = s.subscribe();
        s.set_field("charset", "blocks", Instant::now()).unwrap();
        assert_eq!(rx.borrow().charset, "blocks");
    }

    #[test]
    fn test_debounce_window_follows_config() {
        let t0 = Instant::now();
        let mut s = store();
        s.set_field("debounce_ms", "50", t0).unwrap();
        s.set_field("blur", "1", t0).unwrap();
        assert_eq!(s.deadline(), Some(t0 + Duration::from_millis(50)));
    }
}
